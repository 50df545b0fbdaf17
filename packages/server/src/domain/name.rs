//! Random display names and spawn points for newcomers.

use hiroba_shared::position::Position;
use rand::Rng;

const ADJECTIVES: [&str; 20] = [
    "sleepy", "bouncy", "fuzzy", "grumpy", "sneaky", "wobbly", "crunchy", "spicy", "toasty",
    "dizzy", "frosty", "jolly", "mellow", "perky", "zesty", "breezy", "chunky", "peppy", "silky",
    "wiggly",
];

const NOUNS: [&str; 20] = [
    "cabbage", "sprout", "turnip", "radish", "kale", "chard", "endive", "arugula", "kohlrabi",
    "fennel", "parsnip", "rutabaga", "celery", "broccoli", "bokchoy", "collard", "radicchio",
    "shallot", "scallion", "daikon",
];

/// `"<adjective> <noun>"`, both drawn uniformly.
pub fn generate_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    format!("{adjective} {noun}")
}

/// Spawn somewhere around the lower middle of the canvas.
pub fn spawn_position<R: Rng + ?Sized>(rng: &mut R) -> Position {
    Position {
        x: 0.3 + rng.random::<f64>() * 0.4,
        y: 0.5 + rng.random::<f64>() * 0.3,
    }
}
