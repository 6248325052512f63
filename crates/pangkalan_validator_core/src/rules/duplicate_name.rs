use rustc_hash::FxHashMap;

use crate::{DocumentInput, NoticeContainer, ValidationNotice, Validator};

const CODE_DUPLICATE_LOCATION_NAME: &str = "duplicate_location_name";
const LISTED_NAMES: usize = 3;

/// Emits one warning naming locations that share a name.
#[derive(Debug, Default)]
pub struct DuplicateNameValidator;

impl Validator for DuplicateNameValidator {
    fn name(&self) -> &'static str {
        "duplicate_location_name"
    }

    fn validate(&self, document: &DocumentInput, notices: &mut NoticeContainer) {
        let duplicates = duplicate_names(document.names());
        if duplicates.is_empty() {
            return;
        }

        let listed = duplicates
            .iter()
            .take(LISTED_NAMES)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let ellipsis = if duplicates.len() > LISTED_NAMES {
            "..."
        } else {
            ""
        };
        notices.push(
            ValidationNotice::warning(
                CODE_DUPLICATE_LOCATION_NAME,
                format!(
                    "{} duplicate location name(s) found: {}{}",
                    duplicates.len(),
                    listed,
                    ellipsis
                ),
            )
            .with_context_field("names", &duplicates),
        );
    }
}

/// Names seen more than once, ordered by where their first repeat appears.
fn duplicate_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
    let mut duplicates = Vec::new();
    for name in names {
        let count = seen.entry(name).or_insert(0);
        *count += 1;
        if *count == 2 {
            duplicates.push(name);
        }
    }
    duplicates
}
