//! Harmonized System code resolution: a curated name -> code map for the
//! most common products, then token search over the 2/4/6-digit hierarchy.

/// Curated mapping for products users actually ask about.
const CURATED: &[(&str, &str)] = &[
    ("total", "TOTAL"),
    ("all products", "TOTAL"),
    ("everything", "TOTAL"),
    ("crude oil", "2709"),
    ("oil", "2709"),
    ("petroleum", "2709"),
    ("refined petroleum", "2710"),
    ("natural gas", "2711"),
    ("lng", "2711"),
    ("coal", "2701"),
    ("cars", "8703"),
    ("automobiles", "8703"),
    ("vehicles", "8703"),
    ("auto parts", "8708"),
    ("semiconductors", "8542"),
    ("chips", "8542"),
    ("integrated circuits", "8542"),
    ("phones", "8517"),
    ("smartphones", "8517"),
    ("computers", "8471"),
    ("laptops", "8471"),
    ("wheat", "1001"),
    ("corn", "1005"),
    ("maize", "1005"),
    ("rice", "1006"),
    ("soybeans", "1201"),
    ("coffee", "0901"),
    ("sugar", "1701"),
    ("beef", "0201"),
    ("pork", "0203"),
    ("gold", "7108"),
    ("silver", "7106"),
    ("copper", "7403"),
    ("aluminum", "7601"),
    ("steel", "7208"),
    ("iron ore", "2601"),
    ("lithium", "2836"),
    ("pharmaceuticals", "3004"),
    ("medicines", "3004"),
    ("vaccines", "3002"),
    ("aircraft", "8802"),
    ("lumber", "4407"),
    ("timber", "4407"),
    ("cotton", "5201"),
    ("wine", "2204"),
    ("beer", "2203"),
    ("chocolate", "1806"),
    ("cheese", "0406"),
    ("fish", "0302"),
    ("electricity", "2716"),
    ("fertilizer", "3102"),
    ("fertilizers", "3102"),
    ("plastics", "3901"),
    ("tires", "4011"),
    ("furniture", "9403"),
    ("toys", "9503"),
    ("footwear", "6403"),
];

/// HS chapter/heading hierarchy used for token search when the curated map
/// misses. 2-digit chapters plus the headings most often traded.
const HIERARCHY: &[(&str, &str)] = &[
    ("01", "live animals"),
    ("02", "meat and edible meat offal"),
    ("03", "fish and crustaceans"),
    ("04", "dairy produce eggs honey"),
    ("07", "edible vegetables"),
    ("08", "edible fruit and nuts"),
    ("09", "coffee tea mate and spices"),
    ("10", "cereals"),
    ("1001", "wheat and meslin"),
    ("1005", "maize corn"),
    ("1006", "rice"),
    ("12", "oil seeds and oleaginous fruits"),
    ("1201", "soya beans"),
    ("15", "animal or vegetable fats and oils"),
    ("17", "sugars and sugar confectionery"),
    ("22", "beverages spirits and vinegar"),
    ("2204", "wine of fresh grapes"),
    ("26", "ores slag and ash"),
    ("2601", "iron ores and concentrates"),
    ("27", "mineral fuels oils and products"),
    ("2701", "coal briquettes"),
    ("2709", "petroleum oils crude"),
    ("2710", "petroleum oils refined not crude"),
    ("2711", "petroleum gases natural gas"),
    ("28", "inorganic chemicals"),
    ("30", "pharmaceutical products"),
    ("3002", "blood vaccines toxins cultures"),
    ("3004", "medicaments packaged doses"),
    ("31", "fertilisers"),
    ("39", "plastics and articles thereof"),
    ("40", "rubber and articles thereof"),
    ("4011", "new pneumatic tyres of rubber"),
    ("44", "wood and articles of wood"),
    ("4407", "wood sawn or chipped lengthwise"),
    ("52", "cotton"),
    ("61", "apparel knitted or crocheted"),
    ("62", "apparel not knitted"),
    ("64", "footwear gaiters"),
    ("71", "pearls precious stones metals"),
    ("7106", "silver unwrought or semi-manufactured"),
    ("7108", "gold unwrought or semi-manufactured"),
    ("72", "iron and steel"),
    ("7208", "flat-rolled iron products"),
    ("74", "copper and articles thereof"),
    ("7403", "refined copper and copper alloys"),
    ("76", "aluminium and articles thereof"),
    ("7601", "unwrought aluminium"),
    ("84", "nuclear reactors boilers machinery"),
    ("8471", "automatic data processing machines computers"),
    ("85", "electrical machinery and equipment"),
    ("8517", "telephones smartphones network apparatus"),
    ("8542", "electronic integrated circuits"),
    ("87", "vehicles other than railway"),
    ("8703", "motor cars passenger vehicles"),
    ("8708", "parts and accessories of motor vehicles"),
    ("88", "aircraft spacecraft"),
    ("8802", "aeroplanes helicopters spacecraft"),
    ("94", "furniture bedding lamps"),
    ("9403", "other furniture and parts"),
    ("95", "toys games and sports requisites"),
    ("9503", "tricycles scooters dolls toys"),
];

/// Resolve a product label to an HS code (or `TOTAL`). Accepts a literal
/// 2/4/6-digit code verbatim; otherwise tries the curated map, then token
/// overlap against the hierarchy (deepest code wins ties).
#[must_use]
pub fn resolve_hs_code(product: &str) -> Option<String> {
    let needle = product.trim().to_lowercase();
    if needle.is_empty() {
        return Some("TOTAL".to_string());
    }
    if needle.chars().all(|c| c.is_ascii_digit()) && matches!(needle.len(), 2 | 4 | 6) {
        return Some(needle);
    }
    if let Some((_, code)) = CURATED.iter().find(|(name, _)| *name == needle) {
        return Some((*code).to_string());
    }

    let tokens: Vec<&str> = needle
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .collect();
    if tokens.is_empty() {
        return None;
    }
    let mut best: Option<(usize, usize, &str)> = None; // (matches, code_len, code)
    for (code, description) in HIERARCHY {
        let matches = tokens.iter().filter(|t| description.contains(**t)).count();
        if matches == 0 {
            continue;
        }
        let candidate = (matches, code.len(), *code);
        if best.is_none_or(|b| (candidate.0, candidate.1) > (b.0, b.1)) {
            best = Some(candidate);
        }
    }
    best.map(|(_, _, code)| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::resolve_hs_code;

    #[test]
    fn curated_names_resolve() {
        assert_eq!(resolve_hs_code("crude oil").as_deref(), Some("2709"));
        assert_eq!(resolve_hs_code("Cars").as_deref(), Some("8703"));
        assert_eq!(resolve_hs_code("total").as_deref(), Some("TOTAL"));
    }

    #[test]
    fn literal_codes_pass_through() {
        assert_eq!(resolve_hs_code("8542").as_deref(), Some("8542"));
        assert_eq!(resolve_hs_code("27").as_deref(), Some("27"));
    }

    #[test]
    fn hierarchy_search_prefers_deeper_codes() {
        // "petroleum" appears in chapter 27 and headings 2709/2710/2711;
        // "crude" narrows to 2709.
        assert_eq!(resolve_hs_code("petroleum crude").as_deref(), Some("2709"));
        assert_eq!(resolve_hs_code("integrated circuits").as_deref(), Some("8542"));
    }

    #[test]
    fn unknown_products_fail() {
        assert_eq!(resolve_hs_code("xyzzy"), None);
    }
}
