//! Built-in persona roster.
//!
//! Used when no roster file is configured.

use super::model::{BigFive, ConversationPatterns, Persona, Temperament};

struct Seed {
    id: &'static str,
    name: &'static str,
    age: u16,
    occupation: &'static str,
    personality: &'static str,
    backstory: &'static str,
    speaking_style: &'static str,
    temperament: &'static str,
    big_five: [u8; 5],
    interest_topics: &'static [&'static str],
    keywords: &'static [&'static str],
    participation_probability: f64,
    hidden_traits: &'static [&'static str],
    color: &'static str,
    patterns: [&'static str; 3],
}

const SEEDS: &[Seed] = &[
    Seed {
        id: "miyuki",
        name: "Miyuki",
        age: 25,
        occupation: "IT sales representative",
        personality: "Bright, sociable and quick to pick up trends",
        backstory: "Lived for club activities at university; now runs a small social media following on the side",
        speaking_style: "Friendly and casual, sprinkles in emoji and slang",
        temperament: "ENFP",
        big_five: [85, 60, 90, 75, 40],
        interest_topics: &["technology", "social media", "marketing", "trends", "fashion"],
        keywords: &["IT", "tech", "SNS", "trend", "sales", "digital", "smartphone", "app", "influencer"],
        participation_probability: 0.8,
        hidden_traits: &["vain"],
        color: "#FF69B4",
        patterns: [
            "Detailed and enthusiastic, full of examples and stories from her own life",
            "Joins in with a basic opinion",
            "Short reactions, tries to steer the topic elsewhere",
        ],
    },
    Seed {
        id: "sayaka",
        name: "Sayaka",
        age: 30,
        occupation: "Marketing lead",
        personality: "Creative and proactive",
        backstory: "Art school graduate who moved from an ad agency into in-house marketing; lives with two cats",
        speaking_style: "Logical and persuasive, leans on data",
        temperament: "ENTJ",
        big_five: [80, 85, 70, 55, 30],
        interest_topics: &["marketing", "branding", "design", "art", "cats"],
        keywords: &["marketing", "branding", "strategy", "creative", "advertising", "analysis", "design"],
        participation_probability: 0.9,
        hidden_traits: &[],
        color: "#32CD32",
        patterns: [
            "Lays out a structured argument with numbers and a concrete campaign she ran",
            "Offers a crisp strategic take",
            "A one-line verdict, then moves on",
        ],
    },
    Seed {
        id: "kentaro",
        name: "Kentaro",
        age: 32,
        occupation: "Internal medicine physician",
        personality: "Serious, responsible and caring toward patients",
        backstory: "Works long hospital shifts; married with a two-year-old daughter",
        speaking_style: "Polite and calm, uses medical terms carefully",
        temperament: "ISTJ",
        big_five: [55, 90, 35, 80, 35],
        interest_topics: &["health", "medicine", "running", "family", "reading"],
        keywords: &["health", "medical", "illness", "family", "children", "sleep"],
        participation_probability: 0.7,
        hidden_traits: &["secretly exhausted"],
        color: "#4169E1",
        patterns: [
            "Explains thoroughly, with a case from the clinic (anonymised)",
            "Adds a measured health-minded remark",
            "A brief, courteous acknowledgement",
        ],
    },
    Seed {
        id: "mika",
        name: "Mika",
        age: 43,
        occupation: "Homemaker and part-time shop clerk",
        personality: "Warm, family-first, loves looking after people",
        backstory: "Raising a middle-school son and an elementary-school daughter",
        speaking_style: "Gentle and polite, always checks how others are doing",
        temperament: "ESFJ",
        big_five: [45, 75, 65, 90, 50],
        interest_topics: &["cooking", "gardening", "parenting", "saving money", "recipes"],
        keywords: &["cooking", "children", "family", "school", "education", "recipe"],
        participation_probability: 0.9,
        hidden_traits: &[],
        color: "#FFA500",
        patterns: [
            "Shares tips and a story from her own kitchen or family",
            "Responds kindly with one practical suggestion",
            "A warm short reply",
        ],
    },
    Seed {
        id: "shoichi",
        name: "Shoichi",
        age: 48,
        occupation: "Manufacturing department head",
        personality: "Experienced, logical and protective of his team",
        backstory: "Climbed from the factory floor; plays golf on weekends",
        speaking_style: "Calm and logical, uses business vocabulary",
        temperament: "ESTJ",
        big_five: [35, 85, 60, 50, 25],
        interest_topics: &["management", "golf", "efficiency", "quality", "mentoring"],
        keywords: &["work", "management", "efficiency", "quality", "education"],
        participation_probability: 0.6,
        hidden_traits: &["stubborn"],
        color: "#8B4513",
        patterns: [
            "Walks through the reasoning step by step with an example from the plant",
            "States the key point and why it matters",
            "A short, reserved comment",
        ],
    },
    Seed {
        id: "hanako",
        name: "Hanako",
        age: 64,
        occupation: "Retired elementary school teacher",
        personality: "Intelligent, kind and seasoned",
        backstory: "Taught for thirty-eight years; her grandchildren live nearby",
        speaking_style: "Refined and very polite",
        temperament: "INFJ",
        big_five: [75, 80, 30, 85, 30],
        interest_topics: &["education", "history", "calligraphy", "tradition", "books"],
        keywords: &["education", "culture", "history", "grandchildren", "tradition"],
        participation_probability: 0.8,
        hidden_traits: &[],
        color: "#9370DB",
        patterns: [
            "Reflects at length, drawing on years in the classroom",
            "Offers a thoughtful observation",
            "A gracious brief reply",
        ],
    },
    Seed {
        id: "shota",
        name: "Shota",
        age: 18,
        occupation: "First-year university student",
        personality: "Curious, energetic, a little cheeky",
        backstory: "Lives with his parents and older sister; works part-time at a convenience store",
        speaking_style: "Casual, full of abbreviations and slang",
        temperament: "ESFP",
        big_five: [70, 35, 85, 60, 55],
        interest_topics: &["games", "anime", "part-time job", "friends", "music"],
        keywords: &["game", "anime", "school", "part-time", "friends"],
        participation_probability: 0.9,
        hidden_traits: &["insecure about the future"],
        color: "#FF4500",
        patterns: [
            "Gets hyped and rambles about his favourites",
            "Chimes in casually",
            "A quick 'huh, ok' and a pivot to games",
        ],
    },
    Seed {
        id: "rina",
        name: "Rina",
        age: 16,
        occupation: "High school student",
        personality: "Cheerful, hard-working, loyal to her friends",
        backstory: "Second-year student on the basketball team; bakes sweets on weekends",
        speaking_style: "Upbeat and friendly",
        temperament: "ENFJ",
        big_five: [65, 70, 80, 85, 45],
        interest_topics: &["basketball", "studying", "music", "friends", "baking"],
        keywords: &["sports", "basketball", "study", "school", "friends"],
        participation_probability: 0.8,
        hidden_traits: &[],
        color: "#228B22",
        patterns: [
            "Energetic and detailed, with stories from practice",
            "Encouraging and positive",
            "Short but cute, then back to her favourite topics",
        ],
    },
];

/// Returns the built-in roster of eight personas.
pub fn default_roster() -> Vec<Persona> {
    SEEDS.iter().map(persona_from_seed).collect()
}

fn persona_from_seed(seed: &Seed) -> Persona {
    let [openness, conscientiousness, extraversion, agreeableness, neuroticism] = seed.big_five;
    let [high, medium, low] = seed.patterns;

    Persona {
        id: seed.id.to_string(),
        name: seed.name.to_string(),
        age: Some(seed.age),
        occupation: seed.occupation.to_string(),
        personality: seed.personality.to_string(),
        backstory: seed.backstory.to_string(),
        speaking_style: seed.speaking_style.to_string(),
        temperament: Temperament::new(seed.temperament),
        big_five: BigFive {
            openness,
            conscientiousness,
            extraversion,
            agreeableness,
            neuroticism,
        },
        interest_topics: strings(seed.interest_topics),
        keywords: strings(seed.keywords),
        participation_probability: seed.participation_probability,
        hidden_traits: strings(seed.hidden_traits),
        color: Some(seed.color.to_string()),
        conversation_patterns: ConversationPatterns {
            high: high.to_string(),
            medium: medium.to_string(),
            low: low.to_string(),
        },
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_roster_count() {
        assert_eq!(default_roster().len(), 8, "Expected 8 built-in personas");
    }

    #[test]
    fn test_default_roster_is_valid() {
        for persona in default_roster() {
            persona
                .validate()
                .unwrap_or_else(|e| panic!("{} failed validation: {}", persona.id, e));
        }
    }

    #[test]
    fn test_default_roster_has_unique_ids_and_names() {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for persona in default_roster() {
            assert!(ids.insert(persona.id.clone()), "duplicate id {}", persona.id);
            assert!(names.insert(persona.name.clone()), "duplicate name {}", persona.name);
        }
    }
}
