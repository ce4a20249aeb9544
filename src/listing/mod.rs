//! Forward-only pagination iterators over entity listings.
//!
//! Each iterator is an explicit state machine
//! (`INIT -> FETCHING -> YIELDING -> DONE`) producing one entity per
//! `next()`. The transport refreshes the session token before each
//! page fetch when it is about to expire, so long iterations survive
//! token rotation without caller involvement.
//!
//! Iterators are not thread-safe: one consumer per iterator.

use std::collections::VecDeque;

use crate::error::ServiceResult;
use crate::models::ThingObject;
use crate::services::graph::{BlockingGraphClient, GraphClient, ListingFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Yielding,
    Done,
}

macro_rules! iterator_core {
    ($name:ident, $client:ty) => {
        pub struct $name {
            client: $client,
            filter: ListingFilter,
            buffer: VecDeque<ThingObject>,
            state: State,
            total: Option<u64>,
            yielded: u64,
        }

        impl $name {
            pub(crate) fn new(client: $client, filter: ListingFilter) -> Self {
                Self {
                    client,
                    filter,
                    buffer: VecDeque::new(),
                    state: State::Init,
                    total: None,
                    yielded: 0,
                }
            }

            /// Server-reported total, known after the first page.
            pub fn total(&self) -> Option<u64> {
                self.total
            }

            /// Entities yielded so far.
            pub fn yielded(&self) -> u64 {
                self.yielded
            }

            fn take_buffered(&mut self) -> Option<ThingObject> {
                let entity = self.buffer.pop_front();
                if entity.is_some() {
                    self.yielded += 1;
                }
                entity
            }

            /// Absorb one page and advance the machine state.
            fn absorb(&mut self, page: crate::services::graph::EntityPage) {
                if self.total.is_none() {
                    self.total = Some(page.total);
                }
                if page.entities.is_empty() {
                    self.state = State::Done;
                    return;
                }
                self.buffer.extend(page.entities);
                match page.next_page_id {
                    Some(next) => {
                        self.filter.page_id = Some(next);
                        self.state = State::Yielding;
                    }
                    None => self.state = State::Done,
                }
            }
        }
    };
}

iterator_core!(EntityIterator, GraphClient);
iterator_core!(BlockingEntityIterator, BlockingGraphClient);

impl EntityIterator {
    /// Next entity, or `None` once the listing is exhausted.
    pub async fn next(&mut self) -> ServiceResult<Option<ThingObject>> {
        loop {
            if let Some(entity) = self.take_buffered() {
                return Ok(Some(entity));
            }
            match self.state {
                State::Done => return Ok(None),
                State::Init | State::Yielding => {
                    let page = self.client.listing(&self.filter).await?;
                    self.absorb(page);
                }
            }
        }
    }

    /// Drain the remainder of the listing into a vector.
    pub async fn collect_all(mut self) -> ServiceResult<Vec<ThingObject>> {
        let mut entities = Vec::new();
        while let Some(entity) = self.next().await? {
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Adapt to a `futures::Stream` of entities.
    pub fn into_stream(self) -> impl futures::Stream<Item = ServiceResult<ThingObject>> {
        futures::stream::unfold(self, |mut iterator| async move {
            match iterator.next().await {
                Ok(Some(entity)) => Some((Ok(entity), iterator)),
                Ok(None) => None,
                Err(err) => Some((Err(err), iterator)),
            }
        })
    }
}

impl BlockingEntityIterator {
    /// Next entity, or `None` once the listing is exhausted.
    pub fn next_entity(&mut self) -> ServiceResult<Option<ThingObject>> {
        loop {
            if let Some(entity) = self.take_buffered() {
                return Ok(Some(entity));
            }
            match self.state {
                State::Done => return Ok(None),
                State::Init | State::Yielding => {
                    let page = self.client.listing(&self.filter)?;
                    self.absorb(page);
                }
            }
        }
    }
}

impl Iterator for BlockingEntityIterator {
    type Item = ServiceResult<ThingObject>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entity().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OntologyClassReference;
    use crate::services::graph::EntityPage;
    use crate::services::ServiceConfig;
    use url::Url;

    fn thing(uri: &str) -> ThingObject {
        let mut entity =
            ThingObject::new(OntologyClassReference::new("wacom", "core", "Person"));
        entity.uri = Some(uri.to_string());
        entity
    }

    fn iterator() -> BlockingEntityIterator {
        let config = ServiceConfig::new(Url::parse("https://kg.example.com/graph/v1").unwrap());
        let client = BlockingGraphClient::new(&config).unwrap();
        BlockingEntityIterator::new(
            client,
            ListingFilter::for_type(OntologyClassReference::new("wacom", "core", "Person")),
        )
    }

    #[test]
    fn absorb_terminates_on_empty_page() {
        let mut iterator = iterator();
        iterator.absorb(EntityPage {
            entities: vec![],
            total: 0,
            next_page_id: Some("p2".to_string()),
        });
        assert_eq!(iterator.state, State::Done);
    }

    #[test]
    fn absorb_terminates_on_missing_page_id() {
        let mut iterator = iterator();
        iterator.absorb(EntityPage {
            entities: vec![thing("wacom:entity:a")],
            total: 1,
            next_page_id: None,
        });
        assert_eq!(iterator.state, State::Done);
        assert_eq!(iterator.take_buffered().unwrap().uri.as_deref(), Some("wacom:entity:a"));
        assert_eq!(iterator.yielded(), 1);
    }

    #[test]
    fn absorb_advances_page_token() {
        let mut iterator = iterator();
        iterator.absorb(EntityPage {
            entities: vec![thing("wacom:entity:a"), thing("wacom:entity:b")],
            total: 3,
            next_page_id: Some("p2".to_string()),
        });
        assert_eq!(iterator.state, State::Yielding);
        assert_eq!(iterator.filter.page_id.as_deref(), Some("p2"));
        assert_eq!(iterator.total(), Some(3));
    }
}
