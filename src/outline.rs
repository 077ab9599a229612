//! Point edits over an outline tree.
//!
//! Every operation is a pure function from a section slice to a new `Vec`. Nodes are located by
//! id with a pre-order search. A missing id is a no-op unless the caller opts into
//! [`MissingTarget::Report`], which only applies to `add` and `reorder`.

use serde::{Deserialize, Serialize};

use crate::formats::{HeadingLevel, Outline, OutlineSection, SectionKeywords};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutlineEditError {
    #[error("section not found: {0}")]
    SectionNotFound(String),
    #[error("parent section not found: {0}")]
    ParentNotFound(String),
    #[error("duplicate section id: {0}")]
    DuplicateId(String),
}

/// How `add` and `reorder` treat an id that is not in the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTarget {
    #[default]
    Ignore,
    Report,
}

/// Shallow field merge for [`update_section`]. `id` is intentionally absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<HeadingLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_word_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<SectionKeywords>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<OutlineSection>>,
}

impl SectionPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    fn apply_to(&self, section: &OutlineSection) -> OutlineSection {
        let mut merged = section.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(level) = self.level {
            merged.level = level;
        }
        if let Some(content) = &self.content {
            merged.content = content.clone();
        }
        if let Some(key_points) = &self.key_points {
            merged.key_points = key_points.clone();
        }
        if let Some(count) = self.recommended_word_count {
            merged.recommended_word_count = count;
        }
        if let Some(keywords) = &self.keywords {
            merged.keywords = keywords.clone();
        }
        if let Some(children) = &self.children {
            merged.children = Some(children.clone());
        }
        merged
    }
}

/// The customization record sent by the editor UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutlineEdit {
    Add {
        #[serde(default, rename = "parentId")]
        parent_id: Option<String>,
        section: OutlineSection,
    },
    Remove {
        #[serde(rename = "sectionId")]
        section_id: String,
    },
    Modify {
        #[serde(rename = "sectionId")]
        section_id: String,
        section: SectionPatch,
    },
    Reorder {
        #[serde(rename = "sectionId")]
        section_id: String,
        #[serde(rename = "newIndex")]
        new_index: usize,
    },
}

impl OutlineSection {
    /// A blank section with a freshly generated id.
    pub fn new(title: impl Into<String>, level: HeadingLevel) -> Self {
        Self {
            id: new_section_id(),
            title: title.into(),
            level,
            content: String::new(),
            key_points: Vec::new(),
            recommended_word_count: 0,
            keywords: SectionKeywords::default(),
            children: Some(Vec::new()),
        }
    }

    pub fn children(&self) -> &[OutlineSection] {
        self.children.as_deref().unwrap_or(&[])
    }
}

pub fn new_section_id() -> String {
    format!("sec_{}", uuid::Uuid::new_v4().simple())
}

pub fn update_section(
    sections: &[OutlineSection],
    id: &str,
    patch: &SectionPatch,
) -> Vec<OutlineSection> {
    sections
        .iter()
        .map(|section| {
            if section.id == id {
                return patch.apply_to(section);
            }
            match &section.children {
                Some(children) => OutlineSection {
                    children: Some(update_section(children, id, patch)),
                    ..section.clone()
                },
                None => section.clone(),
            }
        })
        .collect()
}

pub fn add_section(
    sections: &[OutlineSection],
    parent_id: Option<&str>,
    new_section: &OutlineSection,
) -> Vec<OutlineSection> {
    let Some(parent_id) = parent_id else {
        let mut out = sections.to_vec();
        out.push(new_section.clone());
        return out;
    };

    sections
        .iter()
        .map(|section| {
            if section.id == parent_id {
                let mut children = section.children.clone().unwrap_or_default();
                children.push(new_section.clone());
                return OutlineSection {
                    children: Some(children),
                    ..section.clone()
                };
            }
            match &section.children {
                Some(children) => OutlineSection {
                    children: Some(add_section(children, Some(parent_id), new_section)),
                    ..section.clone()
                },
                None => section.clone(),
            }
        })
        .collect()
}

pub fn try_add_section(
    sections: &[OutlineSection],
    parent_id: Option<&str>,
    new_section: &OutlineSection,
) -> Result<Vec<OutlineSection>, OutlineEditError> {
    if let Some(parent_id) = parent_id
        && find_in(sections, parent_id).is_none()
    {
        return Err(OutlineEditError::ParentNotFound(parent_id.to_owned()));
    }
    Ok(add_section(sections, parent_id, new_section))
}

pub fn remove_section(sections: &[OutlineSection], id: &str) -> Vec<OutlineSection> {
    sections
        .iter()
        .filter(|section| section.id != id)
        .map(|section| match &section.children {
            Some(children) => OutlineSection {
                children: Some(remove_section(children, id)),
                ..section.clone()
            },
            None => section.clone(),
        })
        .collect()
}

/// Moves the section to `new_index` within its own sibling sequence, clamped to
/// `[0, len]` where `len` is the sibling count after removal.
pub fn reorder_section(
    sections: &[OutlineSection],
    id: &str,
    new_index: usize,
) -> Vec<OutlineSection> {
    let mut out = sections.to_vec();
    reorder_in_place(&mut out, id, new_index);
    out
}

pub fn try_reorder_section(
    sections: &[OutlineSection],
    id: &str,
    new_index: usize,
) -> Result<Vec<OutlineSection>, OutlineEditError> {
    let mut out = sections.to_vec();
    if reorder_in_place(&mut out, id, new_index) {
        Ok(out)
    } else {
        Err(OutlineEditError::SectionNotFound(id.to_owned()))
    }
}

// Operates on an owned copy, so the caller's tree is never touched.
fn reorder_in_place(siblings: &mut Vec<OutlineSection>, id: &str, new_index: usize) -> bool {
    if let Some(pos) = siblings.iter().position(|s| s.id == id) {
        let moved = siblings.remove(pos);
        let index = new_index.min(siblings.len());
        siblings.insert(index, moved);
        return true;
    }
    siblings.iter_mut().any(|section| match section.children.as_mut() {
        Some(children) => reorder_in_place(children, id, new_index),
        None => false,
    })
}

fn find_in<'a>(sections: &'a [OutlineSection], id: &str) -> Option<&'a OutlineSection> {
    for section in sections {
        if section.id == id {
            return Some(section);
        }
        if let Some(found) = find_in(section.children(), id) {
            return Some(found);
        }
    }
    None
}

/// Fills in ids the generator left out and turns absent `children` into empty sequences.
pub fn ensure_section_ids(sections: &[OutlineSection]) -> Vec<OutlineSection> {
    sections
        .iter()
        .map(|section| {
            let id = if section.id.trim().is_empty() {
                new_section_id()
            } else {
                section.id.clone()
            };
            OutlineSection {
                id,
                children: Some(ensure_section_ids(section.children())),
                ..section.clone()
            }
        })
        .collect()
}

/// Pre-order traversal yielding `(depth, section)`; top-level sections have depth 0.
pub struct Walk<'a> {
    stack: Vec<(usize, &'a OutlineSection)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a OutlineSection);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, section) = self.stack.pop()?;
        for child in section.children().iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some((depth, section))
    }
}

pub fn walk(sections: &[OutlineSection]) -> Walk<'_> {
    Walk {
        stack: sections.iter().rev().map(|s| (0, s)).collect(),
    }
}

impl Outline {
    pub fn new(sections: Vec<OutlineSection>) -> Self {
        Self {
            sections,
            metadata: None,
            seo_guidance: None,
        }
    }

    pub fn walk(&self) -> Walk<'_> {
        walk(&self.sections)
    }

    pub fn find_section(&self, id: &str) -> Option<&OutlineSection> {
        find_in(&self.sections, id)
    }

    pub fn section_ids(&self) -> Vec<&str> {
        self.walk().map(|(_, s)| s.id.as_str()).collect()
    }

    pub fn total_word_count(&self) -> u32 {
        self.walk().map(|(_, s)| s.recommended_word_count).sum()
    }

    /// Fails when the section or parent the edit names is absent. Top-level adds always pass.
    pub fn check_target(&self, edit: &OutlineEdit) -> Result<(), OutlineEditError> {
        match edit {
            OutlineEdit::Add {
                parent_id: Some(parent),
                ..
            } if self.find_section(parent).is_none() => {
                Err(OutlineEditError::ParentNotFound(parent.clone()))
            }
            OutlineEdit::Add { section, .. } => {
                match walk(std::slice::from_ref(section))
                    .find(|(_, s)| self.find_section(&s.id).is_some())
                {
                    Some((_, taken)) => Err(OutlineEditError::DuplicateId(taken.id.clone())),
                    None => Ok(()),
                }
            }
            OutlineEdit::Remove { section_id }
            | OutlineEdit::Modify { section_id, .. }
            | OutlineEdit::Reorder { section_id, .. } => match self.find_section(section_id) {
                Some(_) => Ok(()),
                None => Err(OutlineEditError::SectionNotFound(section_id.clone())),
            },
        }
    }

    /// Fails with the first id that appears on more than one node.
    pub fn check_unique_ids(&self) -> Result<(), OutlineEditError> {
        let mut seen = std::collections::HashSet::new();
        for (_, section) in self.walk() {
            if !seen.insert(section.id.as_str()) {
                return Err(OutlineEditError::DuplicateId(section.id.clone()));
            }
        }
        Ok(())
    }

    /// Applies one edit and returns the new outline. Metadata is carried over untouched.
    pub fn apply(
        &self,
        edit: &OutlineEdit,
        missing: MissingTarget,
    ) -> Result<Self, OutlineEditError> {
        let sections = match edit {
            OutlineEdit::Add { parent_id, section } => match missing {
                MissingTarget::Ignore => add_section(&self.sections, parent_id.as_deref(), section),
                MissingTarget::Report => {
                    try_add_section(&self.sections, parent_id.as_deref(), section)?
                }
            },
            OutlineEdit::Remove { section_id } => remove_section(&self.sections, section_id),
            OutlineEdit::Modify {
                section_id,
                section,
            } => update_section(&self.sections, section_id, section),
            OutlineEdit::Reorder {
                section_id,
                new_index,
            } => match missing {
                MissingTarget::Ignore => reorder_section(&self.sections, section_id, *new_index),
                MissingTarget::Report => {
                    try_reorder_section(&self.sections, section_id, *new_index)?
                }
            },
        };

        tracing::debug!(?edit, sections = sections.len(), "applied outline edit");
        Ok(Self {
            sections,
            ..self.clone()
        })
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (_, section) in self.walk() {
            out.push_str(&"#".repeat(section.level.depth()));
            out.push(' ');
            out.push_str(section.title.trim());
            out.push_str("\n\n");
            if !section.content.trim().is_empty() {
                out.push_str(section.content.trim());
                out.push_str("\n\n");
            }
            if !section.key_points.is_empty() {
                for point in &section.key_points {
                    out.push_str("- ");
                    out.push_str(point.trim());
                    out.push('\n');
                }
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, title: &str, children: Vec<OutlineSection>) -> OutlineSection {
        OutlineSection {
            id: id.to_owned(),
            title: title.to_owned(),
            level: HeadingLevel::H2,
            content: format!("{title} body"),
            key_points: vec![format!("{title} point")],
            recommended_word_count: 100,
            keywords: SectionKeywords {
                primary: vec!["rust".to_owned()],
                secondary: vec![],
                semantic: vec![],
            },
            children: Some(children),
        }
    }

    fn leaf(id: &str) -> OutlineSection {
        section(id, id, vec![])
    }

    fn sample() -> Vec<OutlineSection> {
        vec![
            section("a", "A", vec![leaf("a1"), section("a2", "A2", vec![leaf("a2x")])]),
            leaf("b"),
            section("c", "C", vec![leaf("c1"), leaf("c2"), leaf("c3")]),
        ]
    }

    fn ids(sections: &[OutlineSection]) -> Vec<String> {
        walk(sections).map(|(_, s)| s.id.clone()).collect()
    }

    fn top_ids(sections: &[OutlineSection]) -> Vec<&str> {
        sections.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn walk_is_pre_order_with_depth() {
        let tree = sample();
        let visited = walk(&tree)
            .map(|(d, s)| (d, s.id.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            visited,
            vec![
                (0, "a"),
                (1, "a1"),
                (1, "a2"),
                (2, "a2x"),
                (0, "b"),
                (0, "c"),
                (1, "c1"),
                (1, "c2"),
                (1, "c3"),
            ]
        );
    }

    #[test]
    fn update_changes_only_the_target_fields() {
        let tree = sample();
        let updated = update_section(&tree, "a2x", &SectionPatch::title("X"));

        let outline = Outline::new(updated.clone());
        let node = outline.find_section("a2x").cloned();
        let before = Outline::new(tree.clone()).find_section("a2x").cloned();
        let (Some(node), Some(before)) = (node, before) else {
            panic!("a2x must exist");
        };
        assert_eq!(node.title, "X");
        assert_eq!(node.content, before.content);
        assert_eq!(node.keywords, before.keywords);
        assert_eq!(node.children, before.children);
        assert_eq!(ids(&updated), ids(&tree));
    }

    #[test]
    fn update_with_unknown_id_is_a_no_op() {
        let tree = sample();
        assert_eq!(update_section(&tree, "missing", &SectionPatch::title("X")), tree);
    }

    #[test]
    fn update_does_not_descend_into_a_matched_node() {
        // Colliding ids: the parent matches first, its child is left alone.
        let tree = vec![section("dup", "outer", vec![section("dup", "inner", vec![])])];
        let updated = update_section(&tree, "dup", &SectionPatch::title("X"));
        assert_eq!(updated[0].title, "X");
        assert_eq!(updated[0].children()[0].title, "inner");
    }

    #[test]
    fn add_without_parent_appends_to_top_level() {
        let tree = sample();
        let added = add_section(&tree, None, &leaf("d"));
        assert_eq!(top_ids(&added), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn add_under_parent_appends_to_children_creating_them_when_absent() {
        let mut tree = sample();
        tree[1].children = None;

        let added = add_section(&tree, Some("b"), &leaf("b1"));
        assert_eq!(added[1].children, Some(vec![leaf("b1")]));

        let nested = add_section(&tree, Some("a2"), &leaf("a2y"));
        assert_eq!(top_ids(nested[0].children()[1].children()), vec!["a2x", "a2y"]);
    }

    #[test]
    fn add_with_unknown_parent_is_a_no_op_or_reports() {
        let tree = sample();
        assert_eq!(add_section(&tree, Some("nope"), &leaf("x")), tree);
        assert_eq!(
            try_add_section(&tree, Some("nope"), &leaf("x")),
            Err(OutlineEditError::ParentNotFound("nope".to_owned()))
        );
    }

    #[test]
    fn remove_drops_the_whole_subtree() {
        let tree = sample();
        let removed = remove_section(&tree, "a");
        let remaining = ids(&removed);
        for gone in ["a", "a1", "a2", "a2x"] {
            assert!(!remaining.iter().any(|id| id == gone), "{gone} still present");
        }
        assert_eq!(remaining, vec!["b", "c", "c1", "c2", "c3"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let tree = sample();
        let once = remove_section(&tree, "c2");
        let twice = remove_section(&once, "c2");
        assert_eq!(once, twice);
        assert_eq!(remove_section(&tree, "missing"), tree);
    }

    #[test]
    fn reorder_moves_within_top_level_and_round_trips() {
        let tree = sample();
        let moved = reorder_section(&tree, "a", 2);
        assert_eq!(top_ids(&moved), vec!["b", "c", "a"]);

        let restored = reorder_section(&moved, "a", 0);
        assert_eq!(restored, tree);
    }

    #[test]
    fn reorder_clamps_the_index() {
        let tree = sample();
        let moved = reorder_section(&tree, "b", 99);
        assert_eq!(top_ids(&moved), vec!["a", "c", "b"]);
    }

    #[test]
    fn reorder_nested_section_stays_among_its_siblings() {
        let tree = sample();
        let moved = reorder_section(&tree, "c3", 0);
        assert_eq!(top_ids(&moved), vec!["a", "b", "c"]);
        assert_eq!(top_ids(moved[2].children()), vec!["c3", "c1", "c2"]);
    }

    #[test]
    fn reorder_missing_id_is_a_no_op_or_reports() {
        let tree = sample();
        assert_eq!(reorder_section(&tree, "missing", 0), tree);
        assert_eq!(
            try_reorder_section(&tree, "missing", 0),
            Err(OutlineEditError::SectionNotFound("missing".to_owned()))
        );
    }

    #[test]
    fn edits_never_mutate_the_input() {
        let tree = sample();
        let snapshot = tree.clone();
        let _ = reorder_section(&tree, "c3", 0);
        let _ = remove_section(&tree, "a");
        let _ = add_section(&tree, Some("b"), &leaf("z"));
        let _ = update_section(&tree, "b", &SectionPatch::title("Z"));
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn intro_sub_scenario() {
        let tree = vec![OutlineSection {
            id: "s1".to_owned(),
            ..OutlineSection::new("Intro", HeadingLevel::H2)
        }];
        let sub = OutlineSection {
            id: "s1-1".to_owned(),
            ..OutlineSection::new("Sub", HeadingLevel::H3)
        };

        let tree = add_section(&tree, Some("s1"), &sub);
        assert_eq!(tree[0].children()[0].id, "s1-1");

        let tree = remove_section(&tree, "s1");
        assert!(tree.is_empty());
    }

    #[test]
    fn apply_honours_missing_target_option() -> anyhow::Result<()> {
        let outline = Outline::new(sample());
        let edit = OutlineEdit::Reorder {
            section_id: "ghost".to_owned(),
            new_index: 0,
        };

        assert_eq!(outline.apply(&edit, MissingTarget::Ignore)?, outline);
        assert!(outline.apply(&edit, MissingTarget::Report).is_err());

        let remove = OutlineEdit::Remove {
            section_id: "ghost".to_owned(),
        };
        assert_eq!(outline.apply(&remove, MissingTarget::Report)?, outline);
        Ok(())
    }

    #[test]
    fn outline_edit_parses_ui_payloads() -> anyhow::Result<()> {
        let edit: OutlineEdit = serde_json::from_str(
            r#"{"action":"modify","sectionId":"b","section":{"title":"New","recommendedWordCount":250}}"#,
        )?;
        let outline = Outline::new(sample()).apply(&edit, MissingTarget::Ignore)?;
        let Some(b) = outline.find_section("b") else {
            anyhow::bail!("b missing");
        };
        assert_eq!(b.title, "New");
        assert_eq!(b.recommended_word_count, 250);
        assert_eq!(b.content, "b body");

        let add: OutlineEdit = serde_json::from_str(
            r#"{"action":"add","parentId":null,"section":{"id":"d","title":"D","type":"h2"}}"#,
        )?;
        let outline = outline.apply(&add, MissingTarget::Report)?;
        assert_eq!(outline.sections.len(), 4);
        Ok(())
    }

    #[test]
    fn ensure_section_ids_fills_blanks_and_children() {
        let mut bare = leaf("");
        bare.children = None;
        let filled = ensure_section_ids(&[bare]);
        assert!(filled[0].id.starts_with("sec_"));
        assert_eq!(filled[0].children, Some(Vec::new()));
    }

    #[test]
    fn markdown_follows_heading_levels() {
        let mut tree = sample();
        tree[0].level = HeadingLevel::H1;
        tree[0].children = Some(vec![OutlineSection {
            level: HeadingLevel::H3,
            ..leaf("a1")
        }]);
        let md = Outline::new(tree[..1].to_vec()).to_markdown();
        assert!(md.starts_with("# A\n\nA body\n\n- A point\n\n### a1\n"));
    }

    #[test]
    fn total_word_count_sums_the_tree() {
        assert_eq!(Outline::new(sample()).total_word_count(), 900);
    }

    #[test]
    fn check_target_names_the_missing_id() {
        let outline = Outline::new(sample());
        let remove = OutlineEdit::Remove {
            section_id: "zzz".to_owned(),
        };
        assert_eq!(
            outline.check_target(&remove),
            Err(OutlineEditError::SectionNotFound("zzz".to_owned()))
        );
        let add = OutlineEdit::Add {
            parent_id: Some("nope".to_owned()),
            section: leaf("n"),
        };
        assert_eq!(
            outline.check_target(&add),
            Err(OutlineEditError::ParentNotFound("nope".to_owned()))
        );
        let nested = OutlineEdit::Reorder {
            section_id: "a2x".to_owned(),
            new_index: 0,
        };
        assert_eq!(outline.check_target(&nested), Ok(()));
    }

    #[test]
    fn check_target_rejects_ids_already_in_the_tree() {
        let outline = Outline::new(sample());
        let clash = OutlineEdit::Add {
            parent_id: Some("b".to_owned()),
            section: leaf("a"),
        };
        assert_eq!(
            outline.check_target(&clash),
            Err(OutlineEditError::DuplicateId("a".to_owned()))
        );
        let nested_clash = OutlineEdit::Add {
            parent_id: None,
            section: section("fresh", "Fresh", vec![leaf("c2")]),
        };
        assert_eq!(
            outline.check_target(&nested_clash),
            Err(OutlineEditError::DuplicateId("c2".to_owned()))
        );
        let fresh = OutlineEdit::Add {
            parent_id: None,
            section: section("fresh", "Fresh", vec![leaf("fresh1")]),
        };
        assert_eq!(outline.check_target(&fresh), Ok(()));
    }

    #[test]
    fn check_unique_ids_finds_the_repeated_node() {
        assert_eq!(Outline::new(sample()).check_unique_ids(), Ok(()));
        let repeated = Outline::new(update_section(
            &sample(),
            "b",
            &SectionPatch {
                children: Some(vec![leaf("a1")]),
                ..SectionPatch::default()
            },
        ));
        assert_eq!(
            repeated.check_unique_ids(),
            Err(OutlineEditError::DuplicateId("a1".to_owned()))
        );
    }
}
