//! Catalog data model and tag-group aggregation.
//!
//! [`aggregate`] turns the backend's flat ROM list into the grouped,
//! deterministically ordered view the library page renders. It is a pure
//! function: no I/O, no external state, same input always yields the same
//! view.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Deserialize;

/// One emulated system as reported by `GET /api/systems`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub id: String,
    pub name: String,
    /// EmulatorJS core identifier used when launching a session.
    pub core: String,
    pub rom_count: usize,
}

/// One ROM as reported by `GET /api/roms?system=`.
///
/// Immutable once parsed; a catalog re-fetch replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomRecord {
    /// Display name (file stem, cleaned up by the backend scanner).
    pub name: String,
    /// File name, unique within a system; doubles as the ROM id.
    pub file_name: String,
    pub system: String,
    /// Free-form grouping label. Empty means untagged.
    #[serde(default)]
    pub tag: String,
}

/// A presentation partition of the catalog: one tag and its ROMs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    /// `None` is the untagged sentinel.
    pub tag: Option<String>,
    pub roms: Vec<RomRecord>,
}

impl TagGroup {
    /// Heading text for this group.
    pub fn heading(&self) -> &str {
        self.tag.as_deref().unwrap_or("Untagged")
    }
}

/// Grouped catalog ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    pub groups: Vec<TagGroup>,
    /// True when the whole catalog fell into one partition; callers render
    /// it flat, without headings.
    pub single_group: bool,
}

/// ROM file name with its final extension stripped. Keys the save store
/// and titles the player page.
pub fn rom_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(i) if i > 0 && i + 1 < file_name.len() => &file_name[..i],
        _ => file_name,
    }
}

/// Case-insensitive name ordering with a case-sensitive tiebreak.
///
/// The original frontend sorted with `localeCompare` under whatever locale
/// the browser happened to run in; this comparison is locale-independent
/// (Unicode simple case folding) so every client orders the catalog
/// identically.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Group a flat ROM list by tag for presentation.
///
/// Records are ordered by display name (see [`compare_names`]) and that
/// order is preserved within each group. Groups are ordered by tag with
/// the same comparison, except the untagged group, which always sorts
/// last regardless of where an empty label would fall lexically.
pub fn aggregate(mut roms: Vec<RomRecord>) -> CatalogView {
    roms.sort_by(|a, b| compare_names(&a.name, &b.name));

    // Partition by raw tag (case-sensitive), keeping name order inside
    // each bucket.
    let mut tags: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<RomRecord>> = HashMap::new();
    for rom in roms {
        if !buckets.contains_key(&rom.tag) {
            tags.push(rom.tag.clone());
        }
        buckets.entry(rom.tag.clone()).or_default().push(rom);
    }

    // Untagged last is an explicit tie-break, not a sort-stability side
    // effect.
    tags.sort_by(|a, b| match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare_names(a, b),
    });

    let groups: Vec<TagGroup> = tags
        .into_iter()
        .map(|tag| {
            let roms = buckets.remove(&tag).unwrap_or_default();
            let tag = if tag.is_empty() { None } else { Some(tag) };
            TagGroup { tag, roms }
        })
        .collect();

    let single_group = groups.len() == 1;
    CatalogView {
        groups,
        single_group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    fn rom(name: &str, file: &str, tag: &str) -> RomRecord {
        RomRecord {
            name: name.into(),
            file_name: file.into(),
            system: "gb".into(),
            tag: tag.into(),
        }
    }

    #[test]
    fn empty_catalog_yields_no_groups() {
        let view = aggregate(Vec::new());
        assert!(view.groups.is_empty());
        assert!(!view.single_group);
    }

    #[test]
    fn untagged_group_sorts_last() {
        let view = aggregate(vec![
            rom("A", "a.gb", "Zeta"),
            rom("B", "b.gb", ""),
            rom("C", "c.gb", "Alpha"),
        ]);
        let headings: Vec<&str> = view.groups.iter().map(TagGroup::heading).collect();
        assert_eq!(headings, ["Alpha", "Zeta", "Untagged"]);
        assert!(!view.single_group);
    }

    #[test]
    fn records_sort_case_insensitively() {
        let view = aggregate(vec![rom("Zelda", "z.gb", ""), rom("mario", "m.gb", "")]);
        let names: Vec<&str> = view.groups[0].roms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["mario", "Zelda"]);
    }

    #[test]
    fn partition_key_is_case_sensitive() {
        let view = aggregate(vec![rom("A", "a.gb", "RPG"), rom("B", "b.gb", "rpg")]);
        let headings: Vec<&str> = view.groups.iter().map(TagGroup::heading).collect();
        // Equal after folding, so the case-sensitive tiebreak orders them.
        assert_eq!(headings, ["RPG", "rpg"]);
    }

    #[test]
    fn one_tag_sets_the_single_group_flag() {
        let view = aggregate(vec![rom("A", "a.gb", "Action"), rom("B", "b.gb", "Action")]);
        assert!(view.single_group);
        assert_eq!(view.groups[0].tag.as_deref(), Some("Action"));
    }

    #[test]
    fn all_untagged_sets_the_single_group_flag() {
        let view = aggregate(vec![rom("A", "a.gb", ""), rom("B", "b.gb", "")]);
        assert!(view.single_group);
        assert!(view.groups[0].tag.is_none());
    }

    #[test]
    fn rom_stem_strips_the_final_extension() {
        assert_eq!(rom_stem("mario.gb"), "mario");
        assert_eq!(rom_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(rom_stem("noext"), "noext");
        assert_eq!(rom_stem(".hidden"), ".hidden");
        assert_eq!(rom_stem("trailing."), "trailing.");
    }

    fn arb_rom() -> impl Strategy<Value = RomRecord> {
        let tag = prop_oneof![
            Just(String::new()),
            Just("Action".to_string()),
            Just("RPG".to_string()),
            Just("rpg".to_string()),
            Just("Zeta".to_string()),
        ];
        ("[a-zA-Z0-9 ]{0,12}", "[a-z0-9]{1,8}", tag).prop_map(|(name, file, tag)| RomRecord {
            name,
            file_name: format!("{file}.gb"),
            system: "gb".into(),
            tag,
        })
    }

    proptest! {
        #[test]
        fn aggregation_is_deterministic(roms in vec(arb_rom(), 0..32)) {
            prop_assert_eq!(aggregate(roms.clone()), aggregate(roms));
        }

        #[test]
        fn aggregation_preserves_the_multiset(roms in vec(arb_rom(), 0..32)) {
            let view = aggregate(roms.clone());
            let key = |r: &RomRecord| (r.name.clone(), r.file_name.clone(), r.tag.clone());
            let mut flattened: Vec<RomRecord> =
                view.groups.into_iter().flat_map(|g| g.roms).collect();
            let mut input = roms;
            flattened.sort_by_key(key);
            input.sort_by_key(key);
            prop_assert_eq!(flattened, input);
        }

        #[test]
        fn untagged_partition_is_always_last(roms in vec(arb_rom(), 0..32)) {
            let view = aggregate(roms);
            if let Some(pos) = view.groups.iter().position(|g| g.tag.is_none()) {
                prop_assert_eq!(pos, view.groups.len() - 1);
            }
        }

        #[test]
        fn groups_preserve_name_order(roms in vec(arb_rom(), 0..32)) {
            for group in aggregate(roms).groups {
                for pair in group.roms.windows(2) {
                    prop_assert_ne!(
                        compare_names(&pair[0].name, &pair[1].name),
                        std::cmp::Ordering::Greater
                    );
                }
            }
        }
    }
}
