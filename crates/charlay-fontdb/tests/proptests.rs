use charlay_fontdb::{
    mock::{MockFont, MockFontLoader},
    FontStore,
};
use proptest::prelude::*;

fn store() -> FontStore {
    FontStore::new(Box::new(MockFontLoader))
}

// Property: whichever position the one loaded family member sits at, it wins
proptest! {
    #[test]
    fn prop_resolve_family_finds_the_only_loaded_member(
        names in prop::collection::vec("[a-z]{3,10}", 1..8),
        pick in any::<prop::sample::Index>(),
        quote in any::<bool>(),
    ) {
        let names: Vec<String> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| format!("{}{}", name, i))
            .collect();
        let k = pick.index(names.len());

        let mut store = store();
        let decoy = store.load(&MockFont::new("decoy-default").build(), "decoy-default");
        let loaded = store.load(&MockFont::new(&names[k]).build(), &names[k].to_uppercase());
        prop_assert_ne!(loaded, decoy);

        let css = names
            .iter()
            .map(|n| if quote { format!("\"{}\"", n) } else { n.clone() })
            .collect::<Vec<_>>()
            .join(", ");
        prop_assert_eq!(store.resolve_family(&css), loaded);
    }
}

// Property: nothing measured with a font survives its unload
proptest! {
    #[test]
    fn prop_unload_forgets_cached_widths(
        text in "[ -~]{1,40}",
        sizes in prop::collection::vec(6i32..72, 1..4),
    ) {
        let mut store = store();
        let gone = store.load(&MockFont::new("Gone").build(), "Gone");
        let kept = store.load(&MockFont::new("Kept").build(), "Kept");

        for &px in &sizes {
            store.text_width(gone, text.as_bytes(), px);
            store.text_width(kept, text.as_bytes(), px);
        }
        let kept_entries = store.cache().len() / 2;
        store.unload(gone);
        prop_assert_eq!(store.cache().len(), kept_entries);

        store.cache_mut().reset_stats();
        for &px in &sizes {
            for c in text.chars() {
                prop_assert_eq!(store.cache_mut().get(gone, px as u32, c as u32), None);
            }
        }
        prop_assert_eq!(store.cache().stats().hits, 0);
    }
}
