//! Helper tables exposed to modules under the `modkit` global.

pub mod path;
