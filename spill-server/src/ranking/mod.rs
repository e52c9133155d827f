pub mod tags;
pub mod trending;
pub mod votes;

use uuid::Uuid;

use crate::models::{Confession, PublicConfession};

/// Anything that can be ranked and tag-filtered.
pub trait Listing {
    fn id(&self) -> Uuid;
    fn tags(&self) -> &[String];
}

impl Listing for Confession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Listing for PublicConfession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}
