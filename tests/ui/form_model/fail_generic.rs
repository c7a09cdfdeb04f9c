use calmform::form::FormModel;

#[derive(FormModel)]
struct GenericForm<T> {
    value: T,
}

fn main() {}
