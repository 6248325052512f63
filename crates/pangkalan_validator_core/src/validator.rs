use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::debug;

use crate::{DocumentInput, NoticeContainer, NoticeSeverity, ValidationNotice};

pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, document: &DocumentInput, notices: &mut NoticeContainer);
}

/// Runs every registered validator. Notices are merged in registration
/// order, with or without the `parallel` feature.
#[derive(Default)]
pub struct ValidatorRunner {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorRunner {
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    pub fn register<V>(&mut self, validator: V)
    where
        V: Validator + 'static,
    {
        self.validators.push(Box::new(validator));
    }

    pub fn run(&self, document: &DocumentInput) -> NoticeContainer {
        let mut notices = NoticeContainer::new();
        self.run_with(document, &mut notices);
        notices
    }

    pub fn run_with(&self, document: &DocumentInput, notices: &mut NoticeContainer) {
        #[cfg(feature = "parallel")]
        let results: Vec<NoticeContainer> = {
            use rayon::prelude::*;

            // Worker threads start with default context; carry the caller's over.
            let captured_bounds = crate::region_bounds();
            let captured_threshold = crate::feature_count_warning_threshold();
            self.validators
                .par_iter()
                .map(|validator| {
                    let _bounds_guard = crate::set_region_bounds(captured_bounds);
                    let _threshold_guard =
                        crate::set_feature_count_warning_threshold(captured_threshold);
                    run_validator(validator.as_ref(), document)
                })
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let results: Vec<NoticeContainer> = self
            .validators
            .iter()
            .map(|validator| run_validator(validator.as_ref(), document))
            .collect();

        for local_notices in results {
            notices.merge(local_notices);
        }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

fn run_validator(validator: &dyn Validator, document: &DocumentInput) -> NoticeContainer {
    let mut local_notices = NoticeContainer::new();
    let result = catch_unwind(AssertUnwindSafe(|| {
        validator.validate(document, &mut local_notices)
    }));

    if let Err(panic) = result {
        local_notices.push(runtime_exception_in_validator_error_notice(
            validator.name(),
            panic_payload_message(&*panic),
        ));
    }
    debug!(
        validator = validator.name(),
        notices = local_notices.len(),
        "validator finished"
    );
    local_notices
}

fn runtime_exception_in_validator_error_notice(
    validator: &str,
    message: String,
) -> ValidationNotice {
    let mut notice = ValidationNotice::new(
        "runtime_exception_in_validator_error",
        NoticeSeverity::Error,
        format!("validator {} failed: {}", validator, message),
    );
    notice.insert_context_field("exception", "panic");
    notice.insert_context_field("message", message);
    notice.insert_context_field("validator", validator);
    notice
}

fn panic_payload_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
