//! Built-in vision prompts
//!
//! Prompt text the gateway injects for its own mobile app (selected by the
//! `X-App-Identifier` header). Other apps get an empty prompt and the
//! provider answers generically.

/// Substring of the request `language` field that marks a skin-analysis request
pub const SKIN_ANALYSIS_MARKER: &str = "Fitzpatrick";

/// Master prompt for skin analysis. The model is told to answer with a raw
/// JSON object only; the normalizer still tolerates surrounding prose.
const SKIN_ANALYSIS_PROMPT: &str = r##"You are a precise, automated colorimetric analysis system. Your sole function is to analyze an image of human skin and return data in a specific JSON format.

Instructions:
1.  Analyze the most prominent, well-lit, and shadow-free area of skin in the image (e.g., forehead, cheeks).
2.  Ignore any hair, makeup, or deep shadows. Sample multiple pixels to determine an average color.
3.  Generate two hex color codes: the current skin color and a plausible tanned version that is one shade darker.
4.  Assign a numerical shade value from 1 (palest) to 10 (deepest). The 'next_shade_number' must be exactly one greater than the 'current_shade_number'.
5.  Strictly adhere to the allowed values for each category.

Your response MUST be ONLY the raw JSON object, without any surrounding text, explanations, or markdown like ```json.

Allowed Values:
- "tone": ["fair", "light", "medium", "olive", "brown", "deep"]
- "undertone": ["warm", "cool", "neutral"]
- "uv_sensitivity": ["high", "medium", "low"]
- "texture": ["smooth", "soft", "normal", "radiant"]

JSON Format Example:
{
  "current_hex": "#A8876A",
  "tanned_hex": "#9B7A5E",
  "current_shade_number": 5,
  "next_shade_number": 6,
  "tone": "brown",
  "undertone": "warm",
  "uv_sensitivity": "low",
  "texture": "radiant"
}"##;

/// True when the request asks for skin analysis rather than meal analysis
pub fn is_skin_analysis(language: Option<&str>) -> bool {
    language.is_some_and(|l| l.contains(SKIN_ANALYSIS_MARKER))
}

/// Build the vision prompt for the gateway's own app.
///
/// A `language` containing the skin-analysis marker selects the colorimetric
/// master prompt; anything else gets the meal-nutrition prompt with the
/// answer language interpolated.
pub fn build_vision_prompt(language: Option<&str>) -> String {
    if is_skin_analysis(language) {
        return SKIN_ANALYSIS_PROMPT.to_string();
    }

    format!(
        "Based on the photo of a meal provided, analyze it as if you were a nutritionist and calculate the total calories, calories per 100 grams, carbs, proteins and fats. Name the meal in {}. Please, always return only a JSON object with the following properties: 'name', 'total_calories_estimation': INT, 'calories_100_grams': INT, 'carbs': INT, 'proteins': INT, 'fats': INT.",
        language.unwrap_or("English")
    )
}
