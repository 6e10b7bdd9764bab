use crate::{
    db::DbPool,
    dto::mood::{MoodResponse, UpsellItem, UpsellResponse},
    error::{AppError, AppResult},
    models::{Category, Product},
};

/// One row of the scripted barista: a mood, the phrases that signal it,
/// and the drink it steers the customer toward.
struct MoodEntry {
    mood: &'static str,
    keywords: &'static [&'static str],
    recommendation: &'static str,
    treatment: &'static str,
    intros: &'static [&'static str],
    reason: &'static str,
}

static MOODS: &[MoodEntry] = &[
    MoodEntry {
        mood: "Happy",
        keywords: &[
            "happy", "great", "good", "excited", "love", "amazing", "perfect", "wonderful",
        ],
        recommendation: "Cappuccino",
        treatment: "It's truly wonderful to see you in such high spirits!",
        intros: &[
            "That's absolutely fantastic! Your energy is such a gift.",
            "I'm smiling just hearing that. What a beautiful way to feel.",
            "It's moments like these that make my day. I love this for you!",
        ],
        reason: "A velvety, light Cappuccino is the perfect dance partner for your current joy.",
    },
    MoodEntry {
        mood: "Sad",
        keywords: &[
            "low", "sad", "unhappy", "blue", "depressed", "gloomy", "crying", "bad day",
        ],
        recommendation: "Mocha",
        treatment: "I am so, so sorry you're feeling low right now. Please know that it's okay to not be okay.",
        intros: &[
            "Sending you a warm virtual hug. I'm right here with you.",
            "I wish I could offer you a real hand to hold, but for now, let me offer you my most comforting brew.",
            "It sounds like your heart is a bit heavy today. Let's take it slow, one sip at a time.",
        ],
        reason: "Something rich, chocolatey, and warm like a Mocha can be very grounding and comforting when things feel difficult.",
    },
    MoodEntry {
        mood: "Tired",
        keywords: &[
            "tired", "exhausted", "sleepy", "drained", "long day", "need coffee", "wake up",
        ],
        recommendation: "Double Espresso",
        treatment: "I can tell you've been giving your all today, and that's truly admirable.",
        intros: &[
            "It sounds like you've been working so hard. Please, let yourself take a moment to just be.",
            "I can sense the fatigue, but also the perseverance. You're doing great.",
            "A long day calls for a little extra care. I'm here to help you find your spark again.",
        ],
        reason: "A Double Espresso is my most dedicated way to help you recharge and find that second wind.",
    },
    MoodEntry {
        mood: "Stressed",
        keywords: &[
            "stressed", "busy", "deadline", "work", "anxious", "worried", "pressure",
            "overwhelmed",
        ],
        recommendation: "Latte",
        treatment: "I'm so sorry things are feeling heavy and overwhelming right now.",
        intros: &[
            "Take a deep breath with me. Right now. One... two... three.",
            "I'm here to provide a little pocket of calm in your busy world.",
            "Let's find a way to quiet the noise together. You're not alone in this.",
        ],
        reason: "The warm, gentle texture of a Latte is designed to soothe and help you find a moment of peace.",
    },
    MoodEntry {
        mood: "Chill",
        keywords: &["chill", "relax", "cool", "calm", "vibe", "peaceful"],
        recommendation: "Iced Americano",
        treatment: "It's so peaceful to see you in such a balanced state of mind.",
        intros: &[
            "It sounds like you've found your rhythm. That's a beautiful place to be.",
            "Perfect. Let's match that cool, relaxed energy with something refreshing.",
            "I love this vibe you're bringing. It feels very grounded and serene.",
        ],
        reason: "An Iced Americano is crisp and clear, just like the peace you're feeling right now.",
    },
];

static NEUTRAL: MoodEntry = MoodEntry {
    mood: "Neutral",
    keywords: &[],
    recommendation: "House Blend Coffee",
    treatment: "I'm so grateful you shared that with me.",
    intros: &[
        "I'm here to listen and help you find the perfect brew for your moment.",
        "Thank you for being open with me. I'm here to make your day a little brighter.",
        "Every mood is a journey. I'd be honored to accompany you on yours.",
    ],
    reason: "A classic, reliable choice to accompany you through whatever the day brings.",
};

/// First mood whose keyword appears in the text wins; no match falls back
/// to the neutral entry.
fn detect(text: &str) -> &'static MoodEntry {
    let lower = text.to_lowercase();
    MOODS
        .iter()
        .find(|m| m.keywords.iter().any(|k| lower.contains(k)))
        .unwrap_or(&NEUTRAL)
}

pub async fn analyze(pool: &DbPool, text: &str) -> AppResult<MoodResponse> {
    let entry = detect(text);
    let product = resolve_product(pool, entry.recommendation).await?;

    let intro = entry.intros[text.len() % entry.intros.len()];
    let message = format!(
        "{} {} Based on what you've told me, I've specially selected our {} just for you. {}",
        intro, entry.treatment, product.name, entry.reason
    );

    Ok(MoodResponse {
        mood: entry.mood.to_string(),
        product,
        message,
    })
}

/// Degraded-service lookup chain: the recommended name, then anything
/// with "Coffee" in it, then whatever the catalog has at all.
async fn resolve_product(pool: &DbPool, name_hint: &str) -> AppResult<Product> {
    let pattern = format!("%{}%", name_hint);
    let found: Option<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE name ILIKE $1 ORDER BY created_at LIMIT 1",
    )
    .bind(&pattern)
    .fetch_optional(pool)
    .await?;
    if let Some(product) = found {
        return Ok(product);
    }

    let fallback: Option<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE name ILIKE '%Coffee%' ORDER BY created_at LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    if let Some(product) = fallback {
        return Ok(product);
    }

    let any: Option<Product> =
        sqlx::query_as("SELECT * FROM products ORDER BY created_at LIMIT 1")
            .fetch_optional(pool)
            .await?;
    any.ok_or(AppError::NoCatalogAvailable)
}

fn wants_cookie(items: &[UpsellItem]) -> bool {
    items.iter().any(|item| {
        item.name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains("coffee"))
            || matches!(item.category, Some(Category::Hot) | Some(Category::Cold))
    })
}

pub async fn upsell(pool: &DbPool, items: &[UpsellItem]) -> AppResult<UpsellResponse> {
    let (suggestion, reason) = if wants_cookie(items) {
        ("Chocolate Chip Cookie", "Pairs perfectly with your coffee.")
    } else {
        ("Bottle of Water", "Stay hydrated!")
    };

    let pattern = format!("%{}%", suggestion);
    let product: Option<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE name ILIKE $1 ORDER BY created_at LIMIT 1",
    )
    .bind(&pattern)
    .fetch_optional(pool)
    .await?;

    Ok(UpsellResponse {
        suggestion: suggestion.to_string(),
        product,
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tired_text_maps_to_tired_entry() {
        let entry = detect("I feel tired");
        assert_eq!(entry.mood, "Tired");
        assert_eq!(entry.recommendation, "Double Espresso");
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(detect("SO STRESSED about the deadline").mood, "Stressed");
        assert_eq!(detect("Feeling HAPPY today").mood, "Happy");
    }

    #[test]
    fn multi_word_keywords_match_as_substrings() {
        assert_eq!(detect("what a bad day").mood, "Sad");
        assert_eq!(detect("such a long day at the office").mood, "Tired");
    }

    #[test]
    fn unmatched_text_falls_back_to_neutral() {
        let entry = detect("the weather is fine");
        assert_eq!(entry.mood, "Neutral");
        assert_eq!(entry.recommendation, "House Blend Coffee");
    }

    #[test]
    fn coffee_in_cart_suggests_a_cookie() {
        let items = vec![UpsellItem {
            name: Some("Iced Coffee".into()),
            category: None,
        }];
        assert!(wants_cookie(&items));

        let items = vec![UpsellItem {
            name: Some("Croissant".into()),
            category: Some(Category::Dessert),
        }];
        assert!(!wants_cookie(&items));

        let items = vec![UpsellItem {
            name: None,
            category: Some(Category::Hot),
        }];
        assert!(wants_cookie(&items));
    }
}
