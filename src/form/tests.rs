use super::*;
use futures::executor::block_on;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use crate::scroll::testing::RecordingContainer;
use crate::scroll::{ElementId, LayoutRect, ScrollBehavior, ScrollPosition};

/// Required email with an `@` and a dotted domain, required password of six or more.
struct SignupSchema;

impl SignupSchema {
    fn check(field: &str, values: &FormValues) -> Result<(), String> {
        let text = values.text(field).unwrap_or_default();
        match field {
            "email" if text.trim().is_empty() => Err("email is a required field".into()),
            "email" => match text.split_once('@') {
                Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
                _ => Err("email must be a valid email".into()),
            },
            "password" if text.chars().count() < 6 => {
                Err("password must be at least 6 characters".into())
            }
            _ => Ok(()),
        }
    }
}

impl SchemaValidator for SignupSchema {
    fn validate_sync(&self, values: &FormValues) -> Result<(), Vec<FieldError>> {
        let errors = values
            .keys()
            .filter_map(|key| {
                Self::check(key.as_str(), values)
                    .err()
                    .map(|message| FieldError::new(key, message))
            })
            .collect::<Vec<_>>();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn validate_sync_at(&self, field: &FieldKey, values: &FormValues) -> Result<(), FieldError> {
        Self::check(field.as_str(), values).map_err(|message| FieldError::new(field, message))
    }

    fn is_field_required(&self, field: &FieldKey) -> bool {
        matches!(field.as_str(), "email" | "password")
    }
}

/// Every blank field is required and reported last-declared first.
struct ReversedRequired;

impl SchemaValidator for ReversedRequired {
    fn validate_sync(&self, values: &FormValues) -> Result<(), Vec<FieldError>> {
        let mut errors = values
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(key, _)| FieldError::new(key, format!("{key} is a required field")))
            .collect::<Vec<_>>();
        errors.reverse();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn validate_sync_at(&self, field: &FieldKey, values: &FormValues) -> Result<(), FieldError> {
        match values.get(field.as_str()) {
            Some(value) if !value.is_empty() => Ok(()),
            _ => Err(FieldError::new(field, format!("{field} is a required field"))),
        }
    }

    fn is_field_required(&self, _field: &FieldKey) -> bool {
        true
    }
}

/// Requires `email`. The first full validation parks on `gate` twice: once to
/// announce it has started and once to wait for release.
struct GatedEmail {
    gate: Arc<Barrier>,
    full_runs: AtomicUsize,
}

impl GatedEmail {
    fn check(field: &FieldKey, values: &FormValues) -> Result<(), FieldError> {
        match values.text(field.as_str()) {
            Some(text) if !text.trim().is_empty() => Ok(()),
            _ => Err(FieldError::new(field, format!("{field} is a required field"))),
        }
    }
}

impl SchemaValidator for GatedEmail {
    fn validate_sync(&self, values: &FormValues) -> Result<(), Vec<FieldError>> {
        if self.full_runs.fetch_add(1, Ordering::SeqCst) == 0 {
            self.gate.wait();
            self.gate.wait();
        }
        Self::check(&FieldKey::from("email"), values).map_err(|error| vec![error])
    }

    fn validate_sync_at(&self, field: &FieldKey, values: &FormValues) -> Result<(), FieldError> {
        Self::check(field, values)
    }
}

fn signup_values() -> FormValues {
    FormValues::new().with("email", "").with("password", "")
}

fn signup_form(options: FormOptions) -> FormController {
    FormController::new(
        signup_values(),
        ValidatorAdapter::from_schema(SignupSchema),
        options,
    )
}

fn recorded_outcomes(controller: &FormController) -> Arc<Mutex<Vec<SubmitOutcome>>> {
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = outcomes.clone();
    controller
        .on_submit(move |outcome| sink.lock().expect("outcome sink").push(outcome.clone()))
        .expect("register submit callback");
    outcomes
}

#[test]
fn change_is_visible_immediately() {
    let controller = signup_form(FormOptions::default());
    let change = controller.on_change("email");
    change("someone@example.com".into());
    assert_eq!(
        controller.value("email").expect("value"),
        Some(FieldValue::from("someone@example.com"))
    );
}

#[test]
fn invalid_email_and_empty_password_fail_submit() {
    let controller = signup_form(FormOptions::default());
    let outcomes = recorded_outcomes(&controller);

    controller.on_change("email")("bad".into());
    let outcome = block_on(controller.submit()).expect("submit");

    assert!(!outcome.is_valid);
    assert_eq!(outcome.first_error_field, Some(FieldKey::from("email")));
    let errors = controller.errors().expect("errors");
    assert!(errors.has_error("email"));
    assert!(errors.has_error("password"));
    assert_eq!(
        controller.phase().expect("phase"),
        FormPhase::Submitted { valid: false }
    );
    assert_eq!(outcomes.lock().expect("outcomes").as_slice(), [outcome]);
}

#[test]
fn valid_values_submit_without_error_field() {
    let controller = signup_form(FormOptions::default());
    let outcomes = recorded_outcomes(&controller);

    controller.on_change("email")("a@b.com".into());
    controller.on_change("password")("secret1".into());
    let outcome = block_on(controller.submit()).expect("submit");

    assert!(outcome.is_valid);
    assert_eq!(outcome.first_error_field, None);
    assert_eq!(outcome.values.text("password"), Some("secret1"));
    let recorded = outcomes.lock().expect("outcomes");
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].first_error_field, None);
}

#[test]
fn unvalidated_form_always_submits() {
    let controller = FormController::new(
        signup_values(),
        ValidatorAdapter::unvalidated(),
        FormOptions::default(),
    );
    controller.on_change("email")("definitely not an email".into());
    controller.on_blur("email")();

    let outcome = controller.validate_submit().expect("submit");
    assert!(outcome.is_valid);
    assert_eq!(outcome.first_error_field, None);
    assert!(controller.errors().expect("errors").is_empty());
    assert_eq!(controller.progress().expect("progress"), Progress::default());
}

#[test]
fn first_error_follows_declaration_order() {
    let controller = FormController::new(
        FormValues::new().with("name", "").with("email", ""),
        ValidatorAdapter::from_schema(ReversedRequired),
        FormOptions::default(),
    );

    let outcome = controller.validate_submit().expect("submit");
    assert_eq!(outcome.first_error_field, Some(FieldKey::from("name")));

    let again = controller.validate_submit().expect("resubmit");
    assert_eq!(again.first_error_field, outcome.first_error_field);
    assert_eq!(controller.snapshot().expect("snapshot").submit_count, 2);
}

#[test]
fn overlapping_submits_each_report_once() {
    let gate = Arc::new(Barrier::new(2));
    let controller = FormController::new(
        FormValues::new().with("email", ""),
        ValidatorAdapter::from_schema(GatedEmail {
            gate: gate.clone(),
            full_runs: AtomicUsize::new(0),
        }),
        FormOptions::default(),
    );
    let outcomes = recorded_outcomes(&controller);

    let first = thread::spawn({
        let controller = controller.clone();
        move || controller.validate_submit()
    });
    gate.wait();
    controller.set_value("email", "a@b.com").expect("change");
    let second = controller.validate_submit().expect("second submit");
    gate.wait();
    let first = first
        .join()
        .expect("first submit thread")
        .expect("first submit");

    assert!(second.is_valid);
    assert!(!first.is_valid);
    assert_eq!(first.first_error_field, Some(FieldKey::from("email")));
    assert_eq!(outcomes.lock().expect("outcomes").len(), 2);

    let snapshot = controller.snapshot().expect("snapshot");
    assert_eq!(snapshot.submit_count, 2);
    assert_eq!(snapshot.phase, FormPhase::Submitted { valid: false });
}

#[test]
fn change_validation_records_error_without_progress() {
    let controller = signup_form(FormOptions {
        validate_on_change: true,
        ..FormOptions::default()
    });
    assert_eq!(
        controller.progress().expect("progress"),
        Progress { count: 0, total: 2 }
    );

    controller.set_value("password", "abc").expect("set password");
    assert!(
        controller
            .error("password")
            .expect("error")
            .is_some_and(|message| !message.is_empty())
    );
    assert_eq!(controller.progress().expect("progress").count, 0);

    controller.set_value("password", "abcdef").expect("fix password");
    assert_eq!(controller.error("password").expect("error"), None);
    assert_eq!(controller.progress().expect("progress").count, 1);

    controller.set_value("password", "abc").expect("break password");
    assert_eq!(controller.progress().expect("progress").count, 0);
}

#[test]
fn change_without_validation_clears_error() {
    let controller = signup_form(FormOptions::default());
    controller.touch("email").expect("blur");
    assert!(controller.error("email").expect("error").is_some());

    controller.set_value("email", "still bad").expect("change");
    assert_eq!(controller.error("email").expect("error"), None);
    assert_eq!(controller.progress().expect("progress").count, 0);
}

#[test]
fn blur_validation_is_skipped_when_change_validation_is_on() {
    let calls = Arc::new(AtomicUsize::new(0));

    struct Counting(Arc<AtomicUsize>);

    impl SchemaValidator for Counting {
        fn validate_sync(&self, _values: &FormValues) -> Result<(), Vec<FieldError>> {
            Ok(())
        }

        fn validate_sync_at(
            &self,
            _field: &FieldKey,
            _values: &FormValues,
        ) -> Result<(), FieldError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let controller = FormController::new(
        signup_values(),
        ValidatorAdapter::from_schema(Counting(calls.clone())),
        FormOptions {
            validate_on_change: true,
            ..FormOptions::default()
        },
    );
    controller.set_value("email", "x").expect("change");
    controller.touch("email").expect("blur");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn blur_success_counts_progress() {
    let controller = signup_form(FormOptions {
        counting_fields: Some(vec![FieldKey::from("email")]),
        ..FormOptions::default()
    });
    controller.set_value("email", "a@b.com").expect("change");
    assert_eq!(controller.progress().expect("progress").count, 0);

    controller.on_blur("email")();
    assert_eq!(
        controller.progress().expect("progress"),
        Progress { count: 1, total: 1 }
    );

    controller.touch("password").expect("blur password");
    assert_eq!(controller.progress().expect("progress").count, 1);
    assert!(controller.error("password").expect("error").is_some());
}

#[test]
fn submit_refreshes_progress() {
    let controller = signup_form(FormOptions {
        count_required_only: false,
        ..FormOptions::default()
    });
    controller.set_value("email", "a@b.com").expect("change");
    let outcome = controller.validate_submit().expect("submit");
    assert!(!outcome.is_valid);
    assert_eq!(
        controller.progress().expect("progress"),
        Progress { count: 1, total: 2 }
    );
}

#[test]
fn unknown_fields_are_rejected() {
    let controller = signup_form(FormOptions::default());
    assert_eq!(
        controller.set_value("nickname", "x"),
        Err(FormError::UnknownField(FieldKey::from("nickname")))
    );
    assert!(controller.touch("nickname").is_err());
    assert!(controller.field_handle("nickname").is_none());

    controller.on_change("nickname")("ignored".into());
    assert!(!controller.values().expect("values").contains("nickname"));
}

#[test]
fn reinitialize_restores_original_values() {
    let controller = signup_form(FormOptions {
        enable_reinitialize: true,
        ..FormOptions::default()
    });
    controller.set_value("email", "changed@example.com").expect("change");
    controller.touch("password").expect("blur");

    assert!(controller.reinitialize(signup_values()).expect("reinitialize"));
    assert_eq!(*controller.values().expect("values"), signup_values());
    assert!(controller.error("password").expect("error").is_some());
}

#[test]
fn reinitialize_is_a_noop_when_disabled_or_empty() {
    let disabled = signup_form(FormOptions::default());
    disabled.set_value("email", "kept").expect("change");
    assert!(!disabled.reinitialize(signup_values()).expect("reinitialize"));
    assert_eq!(disabled.value("email").expect("value"), Some(FieldValue::from("kept")));

    let enabled = signup_form(FormOptions {
        enable_reinitialize: true,
        ..FormOptions::default()
    });
    let before = enabled.snapshot().expect("snapshot");
    assert!(!enabled.reinitialize(FormValues::new()).expect("reinitialize"));
    assert!(enabled.snapshot().expect("snapshot").same_state(&before));
}

#[test]
fn reinitialize_extends_errors_for_new_fields() {
    let controller = signup_form(FormOptions {
        enable_reinitialize: true,
        ..FormOptions::default()
    });
    let next = signup_values().with("referral", "friend");
    controller.reinitialize(next).expect("reinitialize");

    let errors = controller.errors().expect("errors");
    assert!(errors.contains("referral"));
    assert!(
        controller
            .fields()
            .expect("fields")
            .ends_with(&[FieldKey::from("referral")])
    );
    assert!(controller.field_handle("referral").is_none());
}

#[test]
fn every_mutation_produces_a_new_snapshot() {
    let controller = signup_form(FormOptions::default());
    let before = controller.snapshot().expect("snapshot");
    assert!(before.same_state(&controller.snapshot().expect("snapshot")));

    controller.set_value("email", "a@b.com").expect("change");
    let after = controller.snapshot().expect("snapshot");
    assert!(!after.same_state(&before));
    assert_eq!(before.values.text("email"), Some(""));
    assert_eq!(after.values.text("email"), Some("a@b.com"));
}

#[test]
fn failed_submit_scrolls_to_first_error_field() {
    let controller = FormController::new(
        FormValues::new()
            .with("name", "Ada")
            .with("email", "")
            .with("password", ""),
        ValidatorAdapter::from_schema(SignupSchema),
        FormOptions::default(),
    );
    let container = Arc::new(
        RecordingContainer::default()
            .with_rect(ElementId(1), LayoutRect::new(0.0, 0.0, 320.0, 44.0))
            .with_rect(ElementId(2), LayoutRect::new(0.0, 52.0, 320.0, 44.0))
            .with_rect(ElementId(3), LayoutRect::new(0.0, 104.0, 320.0, 44.0)),
    );
    controller.attach_scroll_container(container.clone());
    for (index, handle) in controller.registry().iter().enumerate() {
        handle.attach(ElementId(index as u64 + 1));
    }

    let outcome = block_on(controller.submit()).expect("submit");
    assert_eq!(outcome.first_error_field, Some(FieldKey::from("email")));
    assert_eq!(
        container.scrolls(),
        vec![(ScrollPosition { x: 0.0, y: 52.0 }, ScrollBehavior::Smooth)]
    );
}

#[test]
fn superseded_autoscroll_still_resolves_submit() {
    let controller = signup_form(FormOptions::default());
    let container = Arc::new(
        RecordingContainer::default()
            .with_rect(ElementId(2), LayoutRect::new(0.0, 52.0, 320.0, 44.0)),
    );
    let slow_layout = container.gate(ElementId(2));
    controller.attach_scroll_container(container.clone());
    controller
        .field_handle("email")
        .expect("email handle")
        .attach(ElementId(2));

    block_on(async {
        let mut first = Box::pin(controller.submit());
        assert!(futures::poll!(first.as_mut()).is_pending());

        let second = controller.submit().await.expect("second submit");
        assert_eq!(second.first_error_field, Some(FieldKey::from("email")));

        slow_layout
            .send(LayoutRect::new(0.0, 0.0, 320.0, 44.0))
            .expect("send stale rect");
        let first = first.await.expect("first submit");
        assert_eq!(first.first_error_field, Some(FieldKey::from("email")));
    });

    assert_eq!(
        container.scrolls(),
        vec![(ScrollPosition { x: 0.0, y: 52.0 }, ScrollBehavior::Smooth)]
    );
}

#[test]
fn autoscroll_can_be_disabled() {
    let controller = signup_form(FormOptions {
        autoscroll: false,
        ..FormOptions::default()
    });
    let container = Arc::new(
        RecordingContainer::default().with_rect(ElementId(1), LayoutRect::default()),
    );
    controller.attach_scroll_container(container.clone());
    controller
        .field_handle("email")
        .expect("email handle")
        .attach(ElementId(1));

    let outcome = block_on(controller.submit()).expect("submit");
    assert!(!outcome.is_valid);
    assert!(container.scrolls().is_empty());
}

#[test]
fn missing_layout_does_not_fail_submit() {
    let controller = signup_form(FormOptions::default());
    let outcome = block_on(controller.submit()).expect("submit without container");
    assert!(!outcome.is_valid);
    assert_eq!(block_on(controller.scroll_to_field("email")), None);
}

#[test]
fn binding_exposes_value_error_and_handlers() {
    let controller = signup_form(FormOptions::default());
    let binding = controller.bind("email").expect("bind email");
    assert!(binding.required);
    assert_eq!(binding.value, Some(FieldValue::from("")));
    assert_eq!(binding.handle, controller.field_handle("email").expect("handle"));

    binding.blur();
    assert!(controller.bind("email").expect("rebind").error.is_some());

    binding.change("a@b.com");
    let rebound = controller.bind("email").expect("rebind");
    assert_eq!(rebound.value, Some(FieldValue::from("a@b.com")));
    assert_eq!(rebound.error, None);
    assert!(controller.bind("nickname").is_err());
}

#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq, crate::form::FormModel)]
struct Profile {
    email: String,
    password: String,
    newsletter: bool,
}

#[test]
fn typed_model_round_trips_through_controller() {
    assert_eq!(Profile::field_names(), ["email", "password", "newsletter"]);

    let controller = FormController::from_model(
        Profile {
            email: String::new(),
            password: String::new(),
            newsletter: false,
        },
        ValidatorAdapter::from_schema(SignupSchema),
        FormOptions::default(),
    );
    controller.set_value("email", "a@b.com").expect("email");
    controller.set_value("newsletter", true).expect("newsletter");

    let profile = controller.model::<Profile>().expect("model");
    assert_eq!(profile.email, "a@b.com");
    assert!(profile.newsletter);

    controller.set_value("newsletter", "yes").expect("wrong kind");
    assert_eq!(
        controller.model::<Profile>(),
        Err(FormError::ModelMismatch(FieldKey::from("newsletter")))
    );
}
