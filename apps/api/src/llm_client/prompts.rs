// Shared prompt fragments and prompt-building utilities.
// Each service that needs model calls defines its own prompts.rs alongside it.
// This file holds the cross-cutting pieces every full-document prompt repeats.

/// Instruction enforcing a bare JSON object reply.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with a single valid JSON object. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Non-fabrication rule shared by every prompt that rewrites existing content.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
CRITICAL: NEVER invent facts. Do not add companies, job titles, dates, schools, degrees, \
technologies, tools, or metrics that are not already present in the input. \
Every company, job title, date, school, degree and project name must be carried over verbatim. \
If a detail is not supported by the input, leave it out.";

/// Emphasis rule shared by rewriting prompts.
pub const EMPHASIS_INSTRUCTION: &str = "\
Emphasis: wrap only the highest-signal words or phrases in **double asterisks**: quantified \
results (e.g. **40%**, **$2M**, **3x faster**), key technical skills, and incorporated keywords. \
Never bold generic words such as \"team\", \"project\", or \"experience\". Do not over-bold.";

/// The exact shape of a full resume document reply.
pub const RESUME_JSON_SHAPE: &str = r#"{
  "profile": {
    "name": "string",
    "email": "string",
    "phone": "string",
    "url": "string",
    "summary": "string",
    "location": "string"
  },
  "workExperiences": [
    { "company": "string", "jobTitle": "string", "date": "string", "descriptions": ["string"] }
  ],
  "educations": [
    { "school": "string", "degree": "string", "date": "string", "gpa": "string", "descriptions": ["string"] }
  ],
  "projects": [
    { "project": "string", "date": "string", "descriptions": ["string"] }
  ],
  "skills": {
    "featuredSkills": [
      { "skill": "string", "rating": 4 },
      { "skill": "string", "rating": 4 },
      { "skill": "string", "rating": 3 },
      { "skill": "string", "rating": 3 },
      { "skill": "string", "rating": 3 },
      { "skill": "string", "rating": 3 }
    ],
    "descriptions": ["string"]
  },
  "custom": { "descriptions": ["string"] }
}"#;

/// Fills `{placeholder}` slots shared by all templates.
pub fn fill_shared_fragments(template: &str) -> String {
    template
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{no_fabrication}", NO_FABRICATION_INSTRUCTION)
        .replace("{emphasis}", EMPHASIS_INSTRUCTION)
        .replace("{resume_shape}", RESUME_JSON_SHAPE)
}
