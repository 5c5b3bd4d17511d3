use serde_json::{json, Value};

use crate::branding::BrandAsset;

/// Product copywriting prompt for a one-line idea.
pub fn product_from_idea(idea: &str, categories: &[String]) -> String {
    let categories = if categories.is_empty() {
        "treasury".to_string()
    } else {
        categories.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
    };
    format!(
        "As the sales and marketing lead of a luxury 2030 marketplace, invent a professional product \
         based on this idea: \"{}\".\n\
         Respond with JSON only, containing:\n\
         - name: an attractive, professional trade name\n\
         - price: a sensible price in dollars (for example \"1,200 $\")\n\
         - description: marketing copy focused on quality and features (3 sentences)\n\
         - originStory: a note on the craft or the brand's history (2 sentences)\n\
         - category: one of {}\n\
         - stockQuantity: a default stock level between 5 and 50",
        idea, categories
    )
}

/// Response schema matching `product_from_idea`.
pub fn product_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": {"type": "STRING"},
            "price": {"type": "STRING"},
            "description": {"type": "STRING"},
            "originStory": {"type": "STRING"},
            "category": {"type": "STRING"},
            "stockQuantity": {"type": "NUMBER"}
        },
        "required": ["name", "price", "description", "originStory", "category", "stockQuantity"]
    })
}

pub fn product_image(name: &str) -> String {
    format!(
        "High-end professional studio product photography of {}, minimalist clean background, \
         soft commercial lighting, 8k resolution, elegant presentation for a luxury collection.",
        name
    )
}

pub fn brand_image(asset: BrandAsset, brand_name: &str) -> String {
    match asset {
        BrandAsset::Logo => format!(
            "High-end minimalist luxury monogram logo for '{}', futuristic aesthetic, vector style, \
             sleek geometric precision, metallic silver and electric neon green accents on deep obsidian black, \
             symmetrical professional mark, isolated on solid black, 8k resolution.",
            brand_name
        ),
        BrandAsset::Favicon => format!(
            "Ultra-minimalist favicon icon for '{}', simple bold geometric mark, high contrast neon green on black, \
             clear visibility at small scale, square format, professional app icon style.",
            brand_name
        ),
        BrandAsset::Hero => format!(
            "Cinematic brand visual identity image for '{}'. Abstract high-tech luxury environment, \
             soft flowing neon green energy lines, polished carbon fiber textures, depth of field, \
             futuristic showroom atmosphere, professional lighting, 8k resolution, elegant and powerful.",
            brand_name
        ),
    }
}

pub fn concierge_system(brand_name: &str) -> String {
    format!(
        "You are the personal shopping assistant of {}, a luxury marketplace of the year 2030. \
         Help customers choose the pieces that suit their refined taste. Speak in a professional, \
         modern and courteous tone, and base your suggestions on their needs.",
        brand_name
    )
}
