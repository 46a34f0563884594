//! Change notifications delivered by the host application.

/// An entity was saved or deleted in the host application.
///
/// `entity_type` is the tag adapters are registered under with
/// [`CalendarObserver::observe`](crate::CalendarObserver::observe).
#[derive(Debug, Clone)]
pub enum EntityEvent<E> {
    Changed { entity_type: String, instance: E },
    Deleted { entity_type: String, instance: E },
}

impl<E> EntityEvent<E> {
    pub fn changed(entity_type: impl Into<String>, instance: E) -> Self {
        EntityEvent::Changed {
            entity_type: entity_type.into(),
            instance,
        }
    }

    pub fn deleted(entity_type: impl Into<String>, instance: E) -> Self {
        EntityEvent::Deleted {
            entity_type: entity_type.into(),
            instance,
        }
    }

    pub fn entity_type(&self) -> &str {
        match self {
            EntityEvent::Changed { entity_type, .. } | EntityEvent::Deleted { entity_type, .. } => {
                entity_type
            }
        }
    }

    pub fn instance(&self) -> &E {
        match self {
            EntityEvent::Changed { instance, .. } | EntityEvent::Deleted { instance, .. } => {
                instance
            }
        }
    }
}
