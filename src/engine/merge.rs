use crate::engine::section::Section;

/// Adjacent sections printed as one schedule
pub(crate) type MergeGroup = Vec<Section>;

/// Whether `current` continues the group of `previous`: every comparison value of
/// the previous section must be present and equal in the current one
fn continues(previous: &Section, current: &Section) -> bool {
    previous
        .comparison_values
        .iter()
        .all(|(key, value)| current.comparison_values.get(key) == Some(value))
}

/// Groups runs of adjacent sections with identical comparison values.
/// Order is preserved and every section lands in exactly one group.
pub(crate) fn merge_sections(sections: Vec<Section>) -> Vec<MergeGroup> {
    let mut groups: Vec<MergeGroup> = Vec::new();
    for section in sections {
        match groups.last_mut() {
            Some(group) if group.last().map(|previous| continues(previous, &section)).unwrap_or(false) => {
                group.push(section)
            }
            _ => groups.push(vec![section]),
        }
    }
    groups
}

/// Data rows of a group, members in order
pub(crate) fn combined_rows(group: &[Section]) -> Vec<Vec<String>> {
    group.iter().flat_map(|section| section.data.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn section(index: usize, values: &[(&str, &str)]) -> Section {
        Section {
            index,
            data: vec![vec![index.to_string()]],
            comparison_values: values
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<BTreeMap<String, String>>(),
            label: String::new(),
        }
    }

    fn indexes(groups: &[MergeGroup]) -> Vec<Vec<usize>> {
        groups
            .iter()
            .map(|group| group.iter().map(|section| section.index).collect())
            .collect()
    }

    #[test]
    fn identical_neighbours_share_a_group() {
        let same = [("B5", "K0+100"), ("S4", "2024.7.1")];
        let groups = merge_sections(vec![section(0, &same), section(1, &same), section(2, &same)]);
        assert_eq!(indexes(&groups), vec![vec![0, 1, 2]]);
        assert_eq!(combined_rows(&groups[0]), vec![vec!["0"], vec!["1"], vec!["2"]]);
    }

    #[test]
    fn one_differing_key_splits() {
        let a = [("B5", "K0+100"), ("S4", "2024.7.1")];
        let b = [("B5", "K0+100"), ("S4", "2024.7.2")];
        let groups = merge_sections(vec![section(0, &a), section(1, &b), section(2, &b), section(3, &a)]);
        assert_eq!(indexes(&groups), vec![vec![0], vec![1, 2], vec![3]]);
    }

    #[test]
    fn merge_is_a_contiguous_partition() {
        let a = [("B5", "1")];
        let b = [("B5", "2")];
        let sections = vec![section(0, &a), section(1, &b), section(2, &a), section(3, &a)];
        let groups = merge_sections(sections.clone());
        let flattened: Vec<Section> = groups.into_iter().flatten().collect();
        assert_eq!(flattened, sections);
        assert!(merge_sections(Vec::new()).is_empty());
    }
}
