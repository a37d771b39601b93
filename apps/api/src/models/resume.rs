//! Resume document schema. The aggregate every generation and revision stage reads or replaces.
//!
//! Field names follow the JSON wire format (`workExperiences`, `jobTitle`, ...).
//! Decoding is lenient inside sections: `null` or missing strings and lists become empty,
//! so a model reply with a sloppy leaf field is normalized instead of rejected.

use serde::{Deserialize, Deserializer, Serialize};

/// Number of entries in the featured-skill rating display.
pub const FEATURED_SKILL_COUNT: usize = 6;

/// Rating given to padded placeholder skills.
pub const DEFAULT_SKILL_RATING: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDocument {
    pub profile: Profile,
    #[serde(default, deserialize_with = "nullable")]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default, deserialize_with = "nullable")]
    pub educations: Vec<Education>,
    #[serde(default, deserialize_with = "nullable")]
    pub projects: Vec<Project>,
    #[serde(default, deserialize_with = "nullable")]
    pub skills: Skills,
    #[serde(default, deserialize_with = "nullable")]
    pub custom: Custom,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: String,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub summary: String,
    #[serde(default, deserialize_with = "nullable")]
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    #[serde(default, deserialize_with = "nullable")]
    pub company: String,
    #[serde(default, deserialize_with = "nullable")]
    pub job_title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub date: String,
    #[serde(default, deserialize_with = "nullable")]
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default, deserialize_with = "nullable")]
    pub school: String,
    #[serde(default, deserialize_with = "nullable")]
    pub degree: String,
    #[serde(default, deserialize_with = "nullable")]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, deserialize_with = "nullable")]
    pub project: String,
    #[serde(default, deserialize_with = "nullable")]
    pub date: String,
    #[serde(default, deserialize_with = "nullable")]
    pub descriptions: Vec<String>,
    /// Excluded from the rendered page but kept in the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skills {
    #[serde(default, deserialize_with = "nullable")]
    pub featured_skills: Vec<FeaturedSkill>,
    /// Free-text category lines, e.g. "Languages: Rust, Go, SQL".
    #[serde(default, deserialize_with = "nullable")]
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedSkill {
    #[serde(default, deserialize_with = "nullable")]
    pub skill: String,
    #[serde(default = "default_rating", deserialize_with = "lenient_rating")]
    pub rating: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Custom {
    #[serde(default, deserialize_with = "nullable")]
    pub descriptions: Vec<String>,
}

impl FeaturedSkill {
    /// Empty slot used to pad the featured list up to six entries.
    pub fn placeholder() -> Self {
        Self {
            skill: String::new(),
            rating: DEFAULT_SKILL_RATING,
        }
    }
}

impl Default for Skills {
    fn default() -> Self {
        Self {
            featured_skills: vec![FeaturedSkill::placeholder(); FEATURED_SKILL_COUNT],
            descriptions: Vec::new(),
        }
    }
}

impl Default for ResumeDocument {
    /// The blank document an editing session starts from: one empty entry per list section.
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            work_experiences: vec![WorkExperience::default()],
            educations: vec![Education {
                gpa: Some(String::new()),
                ..Education::default()
            }],
            projects: vec![Project::default()],
            skills: Skills::default(),
            custom: Custom::default(),
        }
    }
}

impl ResumeDocument {
    /// A document counts as filled in once the candidate has a name.
    pub fn has_content(&self) -> bool {
        !self.profile.name.trim().is_empty()
    }

    /// Brings a document from outside the pipeline up to the shape every stage expects.
    pub fn normalize(&mut self) {
        normalize_featured_skills(&mut self.skills.featured_skills);
    }
}

/// Pads with placeholders or truncates so the list holds exactly six skills.
pub fn normalize_featured_skills(skills: &mut Vec<FeaturedSkill>) {
    skills.truncate(FEATURED_SKILL_COUNT);
    skills.resize(FEATURED_SKILL_COUNT, FeaturedSkill::placeholder());
}

fn default_rating() -> u8 {
    DEFAULT_SKILL_RATING
}

/// Treats an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Models sometimes emit `3.0` or `4.5`; round to the nearest whole rating.
fn lenient_rating<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .map(|r| r.round().clamp(0.0, f64::from(u8::MAX)) as u8)
        .unwrap_or(DEFAULT_SKILL_RATING))
}
