//! Closed product classification taxonomy
//!
//! Read-only reference data. It is rendered into the "valid values" section of
//! oracle prompts; oracle responses are not checked against it.

/// Top-level category values
pub const L1_VALUES: &[&str] = &["Apparel", "Footwear", "None"];

/// L2 values per L1 (Footwear and None have no sub-categories)
pub const L2_VALUES: &[(&str, &[&str])] = &[
    (
        "Apparel",
        &[
            "Bottoms",
            "Tops",
            "Jackets & Outerwear",
            "Bras",
            "Dresses",
            "Track Suits",
            "Underwear",
            "Other Apparel",
        ],
    ),
    ("Footwear", &[]),
    ("None", &[]),
];

/// L3 values per L2 (omitted L2 values have no leaf categories)
pub const L3_VALUES: &[(&str, &[&str])] = &[
    (
        "Bottoms",
        &[
            "Baselayer Bottoms",
            "Fleece Bottoms",
            "Pants",
            "Shorts",
            "Skirts",
            "Tights",
            "Other Bottoms",
        ],
    ),
    (
        "Tops",
        &[
            "Athletic Shirts & Tees",
            "Baselayer Tops",
            "Fleece Tops",
            "Graphic Tees",
            "Polos",
            "Replica Jerseys",
            "Other Tops",
        ],
    ),
    (
        "Jackets & Outerwear",
        &["Jackets", "Outerwear", "Other Jackets & Outerwear"],
    ),
];

pub const GENDER_VALUES: &[&str] = &["Kids", "Men's", "Women's", "Unisex/Undefined"];

/// Field-of-play values valid when L1 = Apparel
pub const FOP_APPAREL_VALUES: &[&str] = &[
    "sportswear",
    "running",
    "basketball",
    "training",
    "soccer",
    "hiking",
    "ski_snowboard",
    "golf",
    "tennis",
    "american_football",
    "baseball",
    "softball",
    "lacrosse",
    "volleyball",
    "swimming",
    "cricket",
    "pickleball",
    "boxing",
    "gymnastics",
    "cheer_dance",
    "rugby",
    "wrestling",
    "field_hockey",
];

/// Field-of-play values valid when L1 = Footwear
pub const FOP_FOOTWEAR_VALUES: &[&str] = &[
    "sportswear",
    "running",
    "basketball",
    "training",
    "soccer",
    "hiking",
    "walking",
    "flip_flops",
    "slides",
    "outdoor_sandals",
    "ski_snowboard",
    "golf",
    "tennis",
    "american_football",
    "baseball",
    "softball",
    "lacrosse",
    "volleyball",
    "cricket",
    "pickleball",
    "boxing",
    "cheer_dance",
    "rugby",
    "wrestling",
    "field_hockey",
];

/// Sub-sport values per field of play
pub const SUB_SPORT_VALUES: &[(&str, &[&str])] = &[
    (
        "sportswear",
        &[
            "sportswear_running",
            "sportswear_basketball",
            "sportswear_tennis",
            "sportswear_soccer",
            "sportswear_skateboarding",
            "sportswear_outdoor",
            "sportswear_other",
        ],
    ),
    (
        "running",
        &[
            "trail_running",
            "road_running",
            "track_field_running",
            "running_other",
        ],
    ),
    (
        "basketball",
        &[
            "signature_basketball",
            "performance_basketball",
            "basketball_other",
        ],
    ),
    ("training", &["cross_training", "yoga", "training_other"]),
    ("soccer", &["outdoor_soccer", "indoor_soccer"]),
];

type ChildTable = &'static [(&'static str, &'static [&'static str])];

fn lookup(table: ChildTable, parent: &str) -> &'static [&'static str] {
    table
        .iter()
        .find(|(key, _)| *key == parent)
        .map(|(_, values)| *values)
        .unwrap_or(&[])
}

/// L2 values allowed under an L1 value
pub fn l2_values(l1: &str) -> &'static [&'static str] {
    lookup(L2_VALUES, l1)
}

/// L3 values allowed under an L2 value
pub fn l3_values(l2: &str) -> &'static [&'static str] {
    lookup(L3_VALUES, l2)
}

/// Sub-sport values allowed under a field of play
pub fn sub_sport_values(fop: &str) -> &'static [&'static str] {
    lookup(SUB_SPORT_VALUES, fop)
}

/// Render the valid-values reference used in oracle prompts
///
/// `null` is listed as a valid answer for every field.
pub fn valid_values_reference() -> String {
    let mut out = String::new();
    let join = |values: &[&str]| {
        let mut all: Vec<&str> = values.to_vec();
        all.push("null");
        all.join(", ")
    };

    out.push_str(&format!("**L1:** {}\n", join(L1_VALUES)));
    for (l1, l2s) in L2_VALUES {
        if !l2s.is_empty() {
            out.push_str(&format!("**L2 (if L1={}):** {}\n", l1, join(*l2s)));
        }
    }
    let leafless_l1: Vec<&str> = L2_VALUES
        .iter()
        .filter(|(_, l2s)| l2s.is_empty())
        .map(|(l1, _)| *l1)
        .collect();
    out.push_str(&format!(
        "**L2 (if L1={}):** null\n",
        leafless_l1.join(" or ")
    ));
    for (l2, l3s) in L3_VALUES {
        out.push_str(&format!("**L3 (if L2={}):** {}\n", l2, join(*l3s)));
    }
    out.push_str("**L3 (other L2 or L1=Footwear/None):** null\n");
    out.push_str(&format!("**Gender:** {}\n", join(GENDER_VALUES)));
    out.push_str(&format!(
        "**Primary FoP (Apparel):** {}\n",
        join(FOP_APPAREL_VALUES)
    ));
    out.push_str(&format!(
        "**Primary FoP (Footwear):** {}\n",
        join(FOP_FOOTWEAR_VALUES)
    ));
    for (fop, subs) in SUB_SPORT_VALUES {
        out.push_str(&format!("**Sub-sport (if Primary FoP={}):** {}\n", fop, join(*subs)));
    }
    out.push_str("**Sub-sport (any other Primary FoP):** null\n");
    out
}
