use charlay_core::types::NO_FONT;
use charlay_fontdb::{
    mock::{MockFont, MockFontLoader},
    FontStore,
};

fn mock_store() -> FontStore {
    let _ = env_logger::builder().is_test(true).try_init();
    FontStore::new(Box::new(MockFontLoader))
}

#[test]
fn test_default_when_single_font_loaded_then_it_is_default() {
    let mut store = mock_store();
    let arial = store.load(&MockFont::new("Arial").build(), "Arial");
    assert_ne!(arial, NO_FONT);
    assert_eq!(store.default_font_id(), arial);
}

#[test]
fn test_resolve_family_when_two_fonts_loaded_then_first_match_wins() {
    let mut store = mock_store();
    let arial = store.load(&MockFont::new("Arial").build(), "Arial");
    let times = store.load(&MockFont::new("Times").build(), "Times");

    assert_eq!(store.resolve_family("Times, Arial"), times);
    assert_eq!(store.resolve_family("Helvetica, Arial"), arial);
    assert_eq!(store.resolve_family("Helvetica"), arial);
    assert_eq!(store.resolve_family("'TIMES' , serif"), times);
}

#[test]
fn test_resolve_family_when_nothing_loaded_then_zero() {
    let store = mock_store();
    assert_eq!(store.resolve_family("Arial, sans-serif"), NO_FONT);
    assert_eq!(store.find_by_name("Arial"), NO_FONT);
}

#[test]
fn test_find_by_name_when_names_collide_then_lowest_id() {
    let mut store = mock_store();
    let first = store.load(&MockFont::new("Dup").build(), "Dup");
    let _second = store.load(&MockFont::new("Dup").build(), " dup ");
    assert_eq!(store.find_by_name("DUP"), first);
}

#[test]
fn test_threshold_when_fonts_cross_fifty_megabytes_then_flag_follows_usage() {
    let mut store = mock_store();
    let small = store.load(&MockFont::new("Small").padded_to(1024).build(), "Small");
    assert_ne!(small, NO_FONT);
    assert!(!store.check_memory_threshold());

    let big_a = store.load(&MockFont::new("BigA").padded_to(26 << 20).build(), "BigA");
    let big_b = store.load(&MockFont::new("BigB").padded_to(26 << 20).build(), "BigB");
    assert!(store.total_memory_usage() > 50 << 20);
    assert!(store.check_memory_threshold());

    store.unload(big_a);
    assert!(!store.check_memory_threshold());
    assert!(store.is_font_loaded(big_b));
}

#[test]
fn test_char_width_when_glyph_present_then_advance_is_used() {
    let mut store = mock_store();
    let id = store.load(&MockFont::new("W").advance_percent(60).build(), "W");
    assert_eq!(store.char_width(id, 'H' as u32, 20), 12);
    assert_eq!(store.cache().stats().misses, 1);
    assert_eq!(store.char_width(id, 'H' as u32, 20), 12);
    assert_eq!(store.cache().stats().hits, 1);
}

#[test]
fn test_char_width_when_latin_glyph_missing_then_digit_zero_stands_in() {
    let mut store = mock_store();
    let id = store.load(&MockFont::new("W").advance_percent(60).build(), "W");
    // U+00E9 is outside the mock's ASCII coverage
    assert_eq!(store.char_width(id, 0xE9, 20), 12);
    assert!(store.cache().contains(id, 20, 0xE9));
}

#[test]
fn test_char_width_when_ideograph_missing_then_zhong_stands_in() {
    let mut store = mock_store();
    let cjk = store.load(
        &MockFont::new("CJK").advance_percent(40).with_cjk().build(),
        "CJK",
    );
    // Extension A isn't covered, but U+4E2D is and it is full width
    assert_eq!(store.char_width(cjk, 0x3400, 20), 20);

    let latin = store.load(&MockFont::new("Latin").advance_percent(40).build(), "Latin");
    assert_eq!(store.char_width(latin, 0x4E2D, 20), 8);
}

#[test]
fn test_char_width_when_punctuation_missing_then_half_size_and_cached() {
    let mut store = mock_store();
    let id = store.load(&MockFont::new("L").advance_percent(90).letters_only().build(), "L");
    assert_eq!(store.char_width(id, ',' as u32, 17), 8);
    assert_eq!(store.char_width(id, 0x3002, 17), 8);
    assert!(store.cache().contains(id, 17, ',' as u32));
}

#[test]
fn test_char_width_when_no_stand_in_exists_then_half_size_uncached() {
    let mut store = mock_store();
    let id = store.load(&MockFont::new("L").advance_percent(90).letters_only().build(), "L");
    assert_eq!(store.char_width(id, 0xE9, 16), 8);
    assert!(!store.cache().contains(id, 16, 0xE9));
}

#[test]
fn test_char_width_when_font_unknown_then_half_size() {
    let mut store = mock_store();
    assert_eq!(store.char_width(7, 'a' as u32, 30), 15);
}

#[test]
fn test_family_width_when_first_font_lacks_glyph_then_next_family_font_used() {
    let mut store = mock_store();
    let latin = store.load(&MockFont::new("Latin").advance_percent(50).build(), "Latin");
    let cjk = store.load(
        &MockFont::new("Han").advance_percent(70).with_cjk().build(),
        "Han",
    );

    let han = store.char_width_for_family("Latin, Han", 0x4E2D, 16);
    assert_eq!(han.font_id, cjk);
    assert_eq!(han.width, 16);
    assert!(store.cache().contains(cjk, 16, 0x4E2D));

    let x = store.char_width_for_family("Latin, Han", 'x' as u32, 16);
    assert_eq!(x.font_id, latin);
    assert_eq!(x.width, 8);
}

#[test]
fn test_family_width_when_no_family_font_has_glyph_then_default_font_used() {
    let mut store = mock_store();
    let latin = store.load(&MockFont::new("Latin").advance_percent(50).build(), "Latin");
    let width = store.char_width_for_family("Missing, AlsoMissing", 'q' as u32, 16);
    assert_eq!(width.font_id, latin);
    assert_eq!(width.width, 8);
}

#[test]
fn test_family_width_when_store_empty_then_half_size() {
    let mut store = mock_store();
    let width = store.char_width_for_family("Anything", 'q' as u32, 16);
    assert_eq!(width.font_id, NO_FONT);
    assert_eq!(width.width, 8);
}

#[test]
fn test_text_width_when_text_has_nul_then_nul_is_free() {
    let mut store = mock_store();
    let id = store.load(&MockFont::new("W").advance_percent(50).build(), "W");
    assert_eq!(store.text_width(id, b"abc", 16), 24);
    assert_eq!(store.text_width(id, b"a\0b", 16), 16);
    assert_eq!(store.text_width(id, b"", 16), 0);
}

#[test]
fn test_font_metrics_when_face_reports_sizes_then_pixels_are_shifted() {
    let mut store = mock_store();
    let id = store.load(&MockFont::new("M").advance_percent(50).build(), "M");
    let m = store.font_metrics(id, 16).unwrap();
    assert_eq!(m.ascent, 12);
    assert_eq!(m.descent, 4);
    assert_eq!(m.height, 19);
    assert_eq!(m.x_height, 8);
    assert_eq!(m.ch_width, 8);
    assert_eq!(store.font(id).map(|f| f.current_size()), Some(16));
    assert!(store.font_metrics(id + 1, 16).is_none());
}

#[test]
fn test_skrifa_store_when_bytes_are_corrupt_then_load_returns_zero() {
    let mut store = FontStore::default();
    assert_eq!(store.loader_name(), "skrifa");
    assert_eq!(store.load(&[0x00, 0x01, 0x00, 0x00, 0xFF, 0xFF], "Broken"), NO_FONT);
    assert_eq!(store.load(b"wOFF-but-not-really", "Broken"), NO_FONT);
    assert_eq!(store.font_count(), 0);
}
