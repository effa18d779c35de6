use super::*;

// -----------------------------------------------------------------------
// normalize_basics
// -----------------------------------------------------------------------

fn fields(name: &str, brand: Option<&str>, pack_size: Option<&str>) -> BasicFields {
    BasicFields {
        name: name.to_owned(),
        brand: brand.map(str::to_owned),
        pack_size: pack_size.map(str::to_owned),
    }
}

#[test]
fn normalize_basics_collapses_name_whitespace() {
    let out = normalize_basics(fields("  Whole \t Milk\n 1L  ", None, None));
    assert_eq!(out.name, "Whole Milk 1L");
}

#[test]
fn normalize_basics_trims_brand_but_keeps_case() {
    let out = normalize_basics(fields("Milk", Some("  MjólkurSamsalan "), None));
    assert_eq!(out.brand.as_deref(), Some("MjólkurSamsalan"));
}

#[test]
fn normalize_basics_keeps_inner_brand_spacing() {
    let out = normalize_basics(fields("Milk", Some(" Acme  Foods "), None));
    assert_eq!(out.brand.as_deref(), Some("Acme  Foods"));
}

#[test]
fn normalize_basics_blank_brand_becomes_none() {
    let out = normalize_basics(fields("Milk", Some("   "), None));
    assert!(out.brand.is_none());
}

#[test]
fn normalize_basics_pack_size_is_lowercased_without_whitespace() {
    let out = normalize_basics(fields("Milk", None, Some(" 6 X 0.5 L ")));
    assert_eq!(out.pack_size.as_deref(), Some("6x0.5l"));
}

#[test]
fn normalize_basics_blank_pack_size_becomes_none() {
    let out = normalize_basics(fields("Milk", None, Some(" \t ")));
    assert!(out.pack_size.is_none());
}

// -----------------------------------------------------------------------
// availability
// -----------------------------------------------------------------------

#[test]
fn clean_availability_text_strips_markup_and_whitespace() {
    assert_eq!(
        clean_availability_text("  <span>Ekki</span> til  á\n    lager  "),
        "ekki til á lager"
    );
}

#[test]
fn clean_availability_text_separates_words_split_by_tags() {
    assert_eq!(clean_availability_text("In<br/>Stock"), "in stock");
}

#[test]
fn classify_cleaned_icelandic_out_of_stock() {
    assert_eq!(
        classify_availability("ekki til á lager"),
        AvailabilityStatus::OutOfStock
    );
}

#[test]
fn classify_raw_uncleaned_text_is_unknown() {
    assert_eq!(
        classify_availability("  <span>Ekki</span> til  á\n    lager  "),
        AvailabilityStatus::Unknown
    );
}

#[test]
fn classify_empty_is_unknown() {
    assert_eq!(classify_availability(""), AvailabilityStatus::Unknown);
}

#[test]
fn classify_unrecognized_is_unknown() {
    assert_eq!(
        classify_availability("ships next week"),
        AvailabilityStatus::Unknown
    );
}

#[test]
fn classify_in_stock_phrases() {
    assert_eq!(
        classify_availability("til á lager"),
        AvailabilityStatus::InStock
    );
    assert_eq!(classify_availability("in stock"), AvailabilityStatus::InStock);
}

#[test]
fn classify_sold_out_and_unavailable() {
    assert_eq!(
        classify_availability("sold out"),
        AvailabilityStatus::OutOfStock
    );
    assert_eq!(
        classify_availability("currently unavailable"),
        AvailabilityStatus::OutOfStock
    );
    assert_eq!(
        classify_availability("uppselt"),
        AvailabilityStatus::OutOfStock
    );
}

#[test]
fn classify_low_stock() {
    assert_eq!(
        classify_availability("fá eintök eftir"),
        AvailabilityStatus::LowStock
    );
    assert_eq!(
        classify_availability("low stock - order soon"),
        AvailabilityStatus::LowStock
    );
}

#[test]
fn availability_status_serializes_screaming_snake_case() {
    let json = serde_json::to_string(&AvailabilityStatus::OutOfStock).unwrap();
    assert_eq!(json, "\"OUT_OF_STOCK\"");
}

// -----------------------------------------------------------------------
// clean_gtin
// -----------------------------------------------------------------------

#[test]
fn clean_gtin_accepts_ean13_with_separators() {
    assert_eq!(
        clean_gtin(" 569-0000 123456 ").as_deref(),
        Some("5690000123456")
    );
}

#[test]
fn clean_gtin_rejects_letters() {
    assert!(clean_gtin("569000012345X").is_none());
}

#[test]
fn clean_gtin_rejects_wrong_length() {
    assert!(clean_gtin("12345").is_none());
    assert!(clean_gtin("").is_none());
}
