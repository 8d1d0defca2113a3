//! Clara's reply generation: ordered keyword triage over user utterances.
//!
//! Rule order is significant. Acute symptom rules are checked before the
//! scheduling rule, which is checked before the emergency rule, which
//! precedes the generic fallback.

/// Local emergency number. Must stay an exact, unambiguous string.
pub const EMERGENCY_NUMBER: &str = "911";

/// Footer notice shown by host UIs alongside the assistant.
pub const EMERGENCY_FOOTER: &str =
    "Clara uses AI to provide healthcare guidance. For emergencies, please call 911.";

/// Greeting spoken shortly after a successful connection.
pub const GREETING: &str = "Hello! I'm Clara, your healthcare assistant. \
    How can I help you today? You can click the microphone button to speak with me.";

/// Greeting used when the connection fell back to text-only mode.
pub const DEGRADED_GREETING: &str = "Hello! I'm Clara, your healthcare assistant. \
    Speech recognition isn't available, but I'm here to help you. How are you feeling today?";

/// Shown when the user presses the mic but no capture capability exists.
pub const CAPTURE_UNAVAILABLE_MESSAGE: &str = "Speech recognition isn't available right now. \
    You can still type your symptoms or questions, and I'll help guide you to the right care.";

/// Shown after a transient recognition failure.
pub const CAPTURE_TROUBLE_MESSAGE: &str =
    "I'm having trouble with speech recognition. Can you try again or tell me how you're feeling?";

/// Shown when the user declined microphone access.
pub const PERMISSION_DENIED_MESSAGE: &str = "I don't have permission to use your microphone. \
    You can enable microphone access, or type your symptoms and I'll help from there.";

struct Rule {
    keywords: &'static [&'static str],
    reply: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        keywords: &["headache", "head"],
        reply: "I'm sorry to hear about your headache. Can you tell me how long you've been \
            experiencing this? Are you also having any nausea, sensitivity to light, or vision changes?",
    },
    Rule {
        keywords: &["fever", "temperature"],
        reply: "A fever can be concerning. Have you taken your temperature? Are you experiencing \
            any other symptoms like chills, body aches, or fatigue?",
    },
    Rule {
        keywords: &["cough", "throat"],
        reply: "I understand you're having throat or cough issues. Is it a dry cough or are you \
            bringing up mucus? Any difficulty swallowing or breathing?",
    },
    Rule {
        keywords: &["stomach", "nausea", "sick"],
        reply: "Stomach issues can be uncomfortable. Are you experiencing nausea, vomiting, or \
            abdominal pain? When did these symptoms start?",
    },
    Rule {
        keywords: &["appointment", "doctor"],
        reply: "I can help you find the right care. Based on your symptoms, would you like me to \
            help you schedule an appointment with your primary care doctor or find an urgent care location?",
    },
    Rule {
        // The reply must keep the explicit instruction to call 911.
        keywords: &["emergency", "urgent"],
        reply: "If this is a medical emergency, please call 911 immediately. For urgent but \
            non-emergency care, I can help you find the nearest urgent care center or emergency room.",
    },
];

const FALLBACK: &str = "Thank you for sharing that with me. Can you tell me more about your \
    symptoms? For example, when did they start and how severe are they on a scale of 1 to 10?";

/// Generate Clara's reply to a user utterance.
///
/// Pure and deterministic: lowercases the utterance, returns the reply of the
/// first rule with a substring match, or the generic clarifying question.
pub fn generate_reply(utterance: &str) -> &'static str {
    let input = utterance.to_lowercase();

    for rule in RULES {
        if rule.keywords.iter().any(|k| input.contains(k)) {
            return rule.reply;
        }
    }

    FALLBACK
}
