use calmform::form::FormModel;

#[derive(FormModel)]
enum Plan {
    Free,
    Pro { seats: String },
}

fn main() {}
