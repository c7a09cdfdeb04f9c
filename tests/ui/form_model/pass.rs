use calmform::Decimal;
use calmform::form::{FormModel, FormValues};

#[derive(Clone, Debug, PartialEq, calmform::form::FormModel)]
struct DemoForm {
    email: String,
    age: Decimal,
    subscribed: bool,
}

fn main() {
    assert_eq!(DemoForm::field_names(), ["email", "age", "subscribed"]);

    let model = DemoForm {
        email: "a@calm.form".to_string(),
        age: Decimal::from(30),
        subscribed: true,
    };
    let values: FormValues = model.clone().into_values();
    assert_eq!(values.text("email"), Some("a@calm.form"));
    assert_eq!(DemoForm::from_values(&values), Ok(model));
}
