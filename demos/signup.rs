//! Headless walk-through of a registration form: progress counting, blur and
//! submit validation, reinitialization, and scrolling to the first invalid field.
//!
//! Run with `RUST_LOG=calmform=trace cargo run --example signup`.

use std::sync::Arc;

use calmform::prelude::*;
use futures::executor::block_on;
use tracing_subscriber::EnvFilter;

const FIELDS: [&str; 10] = [
    "name", "email", "phone", "gender", "birthday", "address", "city", "region", "college",
    "password",
];

struct RegistrationSchema;

impl RegistrationSchema {
    fn check(field: &str, values: &FormValues) -> Result<(), String> {
        let text = values.text(field).unwrap_or_default().trim();
        let required = matches!(field, "name" | "email" | "birthday" | "address" | "password");
        if required && text.is_empty() {
            return Err(format!("{field} is a required field"));
        }
        match field {
            "email" if !text.contains('@') => Err("email must be a valid email".into()),
            "password" if text.chars().count() < 6 => {
                Err("password must be at least 6 characters".into())
            }
            _ => Ok(()),
        }
    }
}

impl SchemaValidator for RegistrationSchema {
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
        matches!(
            field.as_str(),
            "name" | "email" | "birthday" | "address" | "password"
        )
    }
}

/// Stacks every field vertically, 56pt apart, and prints scroll commands.
struct ColumnLayout;

impl ScrollContainer for ColumnLayout {
    fn measure(&self, element: ElementId) -> BoxedLayoutFuture<'_> {
        Box::pin(async move { Ok(LayoutRect::new(16.0, element.0 as f32 * 56.0, 343.0, 48.0)) })
    }

    fn scroll_to(&self, position: ScrollPosition, behavior: ScrollBehavior) {
        println!("scroll to ({}, {}) {behavior:?}", position.x, position.y);
    }
}

fn blank_values(name: &str) -> FormValues {
    FIELDS
        .iter()
        .map(|field| (*field, if *field == "name" { name } else { "" }))
        .collect()
}

fn print_progress(form: &FormController) -> FormResult<()> {
    let progress = form.progress()?;
    println!("progress {}/{}", progress.count, progress.total);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let form = FormController::new(
        blank_values("n"),
        ValidatorAdapter::from_schema(RegistrationSchema),
        FormOptions {
            enable_reinitialize: true,
            ..FormOptions::default()
        },
    );
    form.attach_scroll_container(Arc::new(ColumnLayout));
    for (index, handle) in form.registry().iter().enumerate() {
        handle.attach(ElementId(index as u64));
    }
    form.on_submit(|outcome| {
        println!(
            "submitted: valid={} first_error={:?}",
            outcome.is_valid, outcome.first_error_field
        );
    })?;

    form.reinitialize(blank_values("name"))?;
    print_progress(&form)?;

    let email = form.bind("email")?;
    email.change("someone");
    email.blur();
    println!("email error: {:?}", form.error("email")?);

    email.change("someone@example.com");
    email.blur();
    print_progress(&form)?;

    block_on(form.submit())?;
    for (field, message) in form.errors()?.iter() {
        println!("  {field}: {message}");
    }

    for (field, value) in [
        ("birthday", "1990-01-01"),
        ("address", "1 Main St"),
        ("password", "secret1"),
    ] {
        form.set_value(field, value)?;
        form.touch(field)?;
    }
    print_progress(&form)?;
    block_on(form.submit())?;
    Ok(())
}
