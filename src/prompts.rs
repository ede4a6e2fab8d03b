//! Prompt profiles and the fixed response schema.
//!
//! Every prompt lives here so that changing what the model is asked to do
//! requires editing exactly one place, and so unit tests can inspect the
//! rendered text without calling a real endpoint.
//!
//! A [`PromptProfile`] bundles the three things that vary between use cases:
//! the template text, the candidate passion list, and whether the photo's
//! capture metadata is offered to the model as context. Callers pick a
//! built-in [`Preset`] or construct their own profile.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Placeholder replaced by the bullet list of candidate passions.
pub const PASSIONS_PLACEHOLDER: &str = "{passions}";

/// Placeholder replaced by the photo's metadata context line.
pub const METADATA_PLACEHOLDER: &str = "{metadata}";

/// Template for the itinerary preset. Uses capture metadata.
pub const ITINERARY_TEMPLATE: &str = r#"You are a travel companion looking at a photo
someone took on a trip.

1. Describe the vibe of the photo in one or two warm, concrete sentences.
2. From the list below, pick every passion the photo clearly shows and mark it "High".
   Pick passions the photo only hints at and mark them "Suggested".
   Only use names exactly as written in the list. Pick none if nothing fits.

Passions:
{passions}

Photo context: {metadata}

Respond with JSON only."#;

/// Template for the nightlife preset.
pub const NIGHTLIFE_TEMPLATE: &str = r#"You are a nightlife scout reviewing a photo
from a night out.

1. Describe the atmosphere in one or two sentences: crowd, lighting, music, energy.
2. Match the photo against the passions below. Use "High" when the photo shows the
   passion directly and "Suggested" when it is only implied. Use the exact names.

Passions:
{passions}

Respond with JSON only."#;

/// Template for the outdoors preset.
pub const OUTDOORS_TEMPLATE: &str = r#"You are an outdoor guide looking at a photo
from someone's adventure.

1. Describe the scene and mood in one or two sentences.
2. Match the photo against the passions below. Use "High" for activities clearly visible,
   "Suggested" for ones the setting invites. Use the exact names.

Passions:
{passions}

Respond with JSON only."#;

const ITINERARY_PASSIONS: &[&str] = &[
    "DJ Sets",
    "Live Music",
    "Street Food",
    "Fine Dining",
    "Museums",
    "Architecture",
    "Markets",
    "Beach Days",
    "Hiking",
    "Wine Tasting",
    "Coffee Culture",
    "Photography Walks",
];

const NIGHTLIFE_PASSIONS: &[&str] = &[
    "DJ Sets",
    "Live Music",
    "Cocktail Bars",
    "Rooftop Bars",
    "Karaoke",
    "Dancing",
    "Comedy Shows",
    "Late-Night Food",
];

const OUTDOORS_PASSIONS: &[&str] = &[
    "Hiking",
    "Camping",
    "Surfing",
    "Climbing",
    "Cycling",
    "Kayaking",
    "Wildlife Watching",
    "Stargazing",
    "Beach Days",
];

/// Built-in prompt profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Preset {
    /// Travel itinerary matching, with capture-date context. (default)
    #[default]
    Itinerary,
    /// Nightlife venues and activities.
    Nightlife,
    /// Outdoor activities.
    Outdoors,
}

impl Preset {
    pub fn profile(self) -> PromptProfile {
        match self {
            Preset::Itinerary => {
                PromptProfile::new("itinerary", ITINERARY_TEMPLATE, ITINERARY_PASSIONS)
                    .with_metadata(true)
            }
            Preset::Nightlife => {
                PromptProfile::new("nightlife", NIGHTLIFE_TEMPLATE, NIGHTLIFE_PASSIONS)
            }
            Preset::Outdoors => {
                PromptProfile::new("outdoors", OUTDOORS_TEMPLATE, OUTDOORS_PASSIONS)
            }
        }
    }
}

/// Prompt text, candidate list and metadata switch for one use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptProfile {
    /// Short identifier, used in logs and JSON output.
    pub name: String,
    /// Template containing `{passions}` and optionally `{metadata}`.
    pub template: String,
    /// Candidate passions the model may match against.
    pub passions: Vec<String>,
    /// Whether the metadata context is derived and offered to the model.
    pub include_metadata: bool,
}

impl Default for PromptProfile {
    fn default() -> Self {
        Preset::default().profile()
    }
}

impl PromptProfile {
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        template: impl Into<String>,
        passions: &[S],
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            passions: passions.iter().map(|p| p.as_ref().to_string()).collect(),
            include_metadata: false,
        }
    }

    pub fn with_metadata(mut self, v: bool) -> Self {
        self.include_metadata = v;
        self
    }

    pub fn with_passions<S: AsRef<str>>(mut self, passions: &[S]) -> Self {
        self.passions = passions.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    /// Render the final prompt for one photo.
    ///
    /// When metadata is disabled or empty the context reads
    /// "No additional context.", so templates never show a bare placeholder.
    pub fn render(&self, metadata_context: &str) -> String {
        let passions = self
            .passions
            .iter()
            .map(|p| format!("- {p}"))
            .collect::<Vec<_>>()
            .join("\n");

        let metadata = if self.include_metadata && !metadata_context.trim().is_empty() {
            metadata_context
        } else {
            "No additional context."
        };

        self.template
            .replace(PASSIONS_PLACEHOLDER, &passions)
            .replace(METADATA_PLACEHOLDER, metadata)
    }
}

/// The `responseSchema` sent with every request.
///
/// Constrains the model to `{description, matchedPassions[{passionName,
/// confidence}]}` with `confidence` limited to the two confidence tiers.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "description": { "type": "STRING" },
            "matchedPassions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "passionName": { "type": "STRING" },
                        "confidence": { "type": "STRING", "enum": ["High", "Suggested"] }
                    },
                    "required": ["passionName", "confidence"]
                }
            }
        },
        "required": ["description", "matchedPassions"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn itinerary_renders_passions_and_metadata() {
        let profile = Preset::Itinerary.profile();
        let prompt = profile.render("Taken on 2024-07-14 21:05 UTC.");
        assert!(prompt.contains("- DJ Sets"));
        assert!(prompt.contains("- Street Food"));
        assert!(prompt.contains("Taken on 2024-07-14 21:05 UTC."));
        assert!(!prompt.contains(PASSIONS_PLACEHOLDER));
        assert!(!prompt.contains(METADATA_PLACEHOLDER));
    }

    #[test]
    fn metadata_is_ignored_when_profile_disables_it() {
        let profile = Preset::Itinerary.profile().with_metadata(false);
        let prompt = profile.render("Taken on 2024-07-14 21:05 UTC.");
        assert!(!prompt.contains("2024-07-14"));
        assert!(prompt.contains("No additional context."));
    }

    #[test]
    fn presets_differ_in_candidates() {
        let night = Preset::Nightlife.profile();
        let outdoors = Preset::Outdoors.profile();
        assert!(night.passions.iter().any(|p| p == "Karaoke"));
        assert!(!outdoors.passions.iter().any(|p| p == "Karaoke"));
        assert!(!night.include_metadata);
    }

    #[test]
    fn custom_passions_replace_preset_list() {
        let profile = Preset::Outdoors.profile().with_passions(&["Kite Flying"]);
        let prompt = profile.render("");
        assert!(prompt.contains("- Kite Flying"));
        assert!(!prompt.contains("- Hiking"));
    }

    #[test]
    fn schema_limits_confidence_to_two_tiers() {
        let schema = response_schema();
        let item = &schema["properties"]["matchedPassions"]["items"];
        let tiers = &item["properties"]["confidence"]["enum"];
        assert_eq!(tiers, &json!(["High", "Suggested"]));
    }
}
