use calmform::form::FormModel;

#[derive(FormModel)]
struct TupleForm(String, bool);

fn main() {}
