//! Reserved sequence markers shared by the preprocessor, vocabularies and models.

pub const PAD: &str = "<pad>";
pub const UNK: &str = "<unk>";
pub const START: &str = "<s>";
pub const EOS: &str = "</s>";

/// Go-marker preceding a seller utterance on the decoder side.
pub const GO_S: &str = "<go-s>";
/// Go-marker preceding a buyer utterance on the decoder side.
pub const GO_B: &str = "<go-b>";

pub const OFFER: &str = "<offer>";
pub const ACCEPT: &str = "<accept>";
pub const REJECT: &str = "<reject>";
pub const QUIT: &str = "<quit>";

pub const START_SLOT: &str = "<slot>";
pub const END_SLOT: &str = "</slot>";

/// Type-form rendering of a price entity.
pub const PRICE: &str = "<price>";

/// All markers in vocabulary order. `PAD` must stay first.
pub const SEQUENCE_MARKERS: &[&str] = &[
    PAD, UNK, START, EOS, GO_S, GO_B, OFFER, ACCEPT, REJECT, QUIT, START_SLOT, END_SLOT, PRICE,
];

/// Category marker, e.g. `<c-car>`.
pub fn category(name: &str) -> String {
    format!("<c-{}>", name.to_lowercase())
}
