use serde::{Deserialize, Serialize};

/// Hard cap imposed by the image-edit endpoint on instruction length.
pub const PROMPT_CAP: usize = 999;

const BASE_PROMPT: &str = "Ultra-realistic, photorealistic, high-resolution interior photograph. \
    Maintain the original room structure: do not move, alter, or obscure the windows, doors, \
    walls, ceiling, floor, or any architectural features. \
    No text, people, or signage. ONLY add beautiful, magazine-quality furniture and decor. \
    Use natural lighting, realistic shadows, and textures. \
    Maintain the original perspective and brightness. ";

// Ordered lookup, matched case-insensitively; unlisted styles contribute no
// arrangement sentence.
const STYLE_ARRANGEMENTS: &[(&str, &str)] = &[
    (
        "modern minimalist",
        "Arrange the furniture in a modern minimalist style: clean lines, neutral palette, \
         uncluttered, open, airy, harmonious, and elegant.",
    ),
    (
        "luxury classic",
        "Arrange the furniture in a luxury classic style: rich materials, elegant details, \
         sophisticated color palette, timeless and refined, with a sense of grandeur.",
    ),
    (
        "scandinavian",
        "Arrange the furniture in Scandinavian style: light woods, organic shapes, cozy \
         textures, functional and inviting, with a bright and serene atmosphere.",
    ),
    (
        "industrial",
        "Arrange the furniture in industrial style: metal accents, raw materials, exposed \
         elements, urban loft feel, and a bold, modern look.",
    ),
    (
        "bohemian",
        "Arrange the furniture in bohemian style: layered textiles, natural materials, \
         eclectic mix, warm colors, and a relaxed, artistic vibe.",
    ),
    (
        "contemporary",
        "Arrange the furniture in contemporary style: current trends, comfortable pieces, \
         balanced design, and a fresh, stylish ambiance.",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "living room")]
    LivingRoom,
    #[serde(rename = "bedroom")]
    Bedroom,
    #[serde(rename = "kitchen")]
    Kitchen,
}

impl RoomType {
    /// Collapse free-text input onto a canonical room type. Unrecognized
    /// input falls back to the living room.
    pub fn from_input(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "living" | "living room" => RoomType::LivingRoom,
            "bedroom" => RoomType::Bedroom,
            "kitchen" => RoomType::Kitchen,
            _ => RoomType::LivingRoom,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::LivingRoom => "living room",
            RoomType::Bedroom => "bedroom",
            RoomType::Kitchen => "kitchen",
        }
    }

    fn furniture(&self) -> &'static str {
        match self {
            RoomType::LivingRoom => {
                "A modern, realistic sofa as the main centerpiece, with a designer coffee table, \
                 accent chairs, media console, plush area rug, throw pillows, modern wall art, \
                 side tables, a sculptural floor lamp, and other living room essentials."
            }
            RoomType::Bedroom => {
                "A realistic, luxurious bed as the main centerpiece, with premium bedding, \
                 modern nightstands, a sleek dresser, reading lamps, a soft area rug, elegant \
                 curtains, wall art, a cozy accent chair, a statement floor mirror, and other \
                 bedroom essentials."
            }
            RoomType::Kitchen => {
                "A realistic kitchen table and appliances as the main centerpiece, with designer \
                 chairs, modern bar stools, pendant lighting, a styled kitchen island, fruit \
                 bowl, premium small appliances, floating wall shelves, upscale kitchen \
                 textiles, and other kitchen essentials."
            }
        }
    }
}

fn style_arrangement(style: &str) -> &'static str {
    STYLE_ARRANGEMENTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(style.trim()))
        .map(|(_, arrangement)| *arrangement)
        .unwrap_or("")
}

/// Assemble the edit instruction: preamble, room furniture, style arrangement,
/// then any caller-supplied text, capped at [`PROMPT_CAP`] characters.
pub fn build_prompt(style: &str, room_type: RoomType, custom: &str) -> String {
    let mut prompt = format!(
        "{BASE_PROMPT}{} {}",
        room_type.furniture(),
        style_arrangement(style)
    );
    let custom = custom.trim();
    if !custom.is_empty() {
        prompt.push(' ');
        prompt.push_str(custom);
    }

    if prompt.chars().count() > PROMPT_CAP {
        let mut truncated: String = prompt.chars().take(PROMPT_CAP - 3).collect();
        truncated.push_str("...");
        prompt = truncated;
    }
    prompt
}
