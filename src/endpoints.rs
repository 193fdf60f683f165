use std::collections::HashMap;

use thiserror::Error;

/// JMX domain every Artemis management bean lives under.
pub const ARTEMIS_DOMAIN: &str = "org.apache.activemq.artemis";

/// Placeholder tokens that may appear inside an object-name template.
///
/// The set is closed: a template can only ever reference one of these, so an
/// unknown placeholder is unrepresentable rather than a runtime surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    BrokerName,
    AddressName,
    QueueName,
    RoutingType,
    AcceptorName,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::BrokerName,
        Placeholder::AddressName,
        Placeholder::QueueName,
        Placeholder::RoutingType,
        Placeholder::AcceptorName,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::BrokerName => "BROKER_NAME",
            Placeholder::AddressName => "ADDRESS_NAME",
            Placeholder::QueueName => "QUEUE_NAME",
            Placeholder::RoutingType => "ROUTING_TYPE",
            Placeholder::AcceptorName => "ACCEPTOR_NAME",
        }
    }
}

/// Caller-supplied placeholder values. Values are inserted verbatim, so any
/// quoting the object-name syntax needs is the caller's job.
pub type Substitutions = HashMap<Placeholder, String>;

/// Which template family an operation draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFamily {
    /// Wildcard-bearing patterns for discovering component instances.
    Search,
    /// Exact-instance patterns for the Jolokia `list` endpoint.
    List,
    /// Exact-instance patterns used as read/exec targets.
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Broker,
    BrokerComponents,
    Address,
    Queue,
    Acceptor,
    BrokerDetails,
    AddressDetails,
    AcceptorDetails,
    QueueDetails,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no {family:?} template for component kind {kind:?}")]
    MissingTemplate {
        kind: ComponentKind,
        family: TemplateFamily,
    },
    #[error("unresolved placeholder `{token}` in `{address}`")]
    UnresolvedPlaceholder {
        token: &'static str,
        address: String,
    },
}

impl ComponentKind {
    /// Template for this kind in the given family, if one exists.
    ///
    /// BROKER_NAME sits inside the literal quotes the object-name syntax
    /// requires because the resolver always substitutes a bare broker name.
    /// Every other placeholder is unquoted; callers quote concrete values
    /// and pass `*` through as-is.
    pub fn template(&self, family: TemplateFamily) -> Result<&'static str, ResolveError> {
        let template = match (family, self) {
            (TemplateFamily::Search, ComponentKind::Broker) => {
                Some("org.apache.activemq.artemis:broker=*")
            }
            (TemplateFamily::Search, ComponentKind::BrokerComponents) => {
                Some("org.apache.activemq.artemis:broker=\"BROKER_NAME\",*")
            }
            (TemplateFamily::Search, ComponentKind::Address) => Some(
                "org.apache.activemq.artemis:broker=\"BROKER_NAME\",component=addresses,address=*",
            ),
            (TemplateFamily::Search, ComponentKind::Queue) => Some(
                "org.apache.activemq.artemis:broker=\"BROKER_NAME\",component=addresses,address=ADDRESS_NAME,subcomponent=queues,*",
            ),
            (TemplateFamily::Search, ComponentKind::Acceptor) => Some(
                "org.apache.activemq.artemis:broker=\"BROKER_NAME\",component=acceptors,name=*",
            ),
            (TemplateFamily::List | TemplateFamily::Name, ComponentKind::BrokerDetails) => {
                Some("org.apache.activemq.artemis:broker=\"BROKER_NAME\"")
            }
            (TemplateFamily::List | TemplateFamily::Name, ComponentKind::AddressDetails) => Some(
                "org.apache.activemq.artemis:broker=\"BROKER_NAME\",component=addresses,address=ADDRESS_NAME",
            ),
            (TemplateFamily::List | TemplateFamily::Name, ComponentKind::AcceptorDetails) => Some(
                "org.apache.activemq.artemis:broker=\"BROKER_NAME\",component=acceptors,name=ACCEPTOR_NAME",
            ),
            (TemplateFamily::List | TemplateFamily::Name, ComponentKind::QueueDetails) => Some(
                "org.apache.activemq.artemis:broker=\"BROKER_NAME\",component=addresses,address=ADDRESS_NAME,subcomponent=queues,routing-type=ROUTING_TYPE,queue=QUEUE_NAME",
            ),
            _ => None,
        };
        template.ok_or(ResolveError::MissingTemplate {
            kind: *self,
            family,
        })
    }
}

/// Expand `template` by substituting the broker name and every caller value,
/// then verify no placeholder token survived.
pub fn resolve(
    template: &str,
    substitutions: &Substitutions,
    broker_name: Option<&str>,
) -> Result<String, ResolveError> {
    let mut address = template.to_string();
    if let Some(name) = broker_name {
        address = address.replace(Placeholder::BrokerName.token(), name);
    }
    for (placeholder, value) in substitutions {
        address = address.replace(placeholder.token(), value);
    }
    for placeholder in Placeholder::ALL {
        if address.contains(placeholder.token()) {
            return Err(ResolveError::UnresolvedPlaceholder {
                token: placeholder.token(),
                address,
            });
        }
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_search_needs_no_substitution() {
        let template = ComponentKind::Broker
            .template(TemplateFamily::Search)
            .unwrap();
        let address = resolve(template, &Substitutions::new(), None).unwrap();
        assert_eq!(address, "org.apache.activemq.artemis:broker=*");
    }

    #[test]
    fn queue_search_substitutes_address_verbatim() {
        let template = ComponentKind::Queue
            .template(TemplateFamily::Search)
            .unwrap();
        let mut subs = Substitutions::new();
        subs.insert(Placeholder::AddressName, "\"DLQ\"".to_string());
        let address = resolve(template, &subs, Some("amq-broker")).unwrap();
        assert_eq!(
            address,
            "org.apache.activemq.artemis:broker=\"amq-broker\",component=addresses,address=\"DLQ\",subcomponent=queues,*"
        );
    }

    #[test]
    fn wildcard_passes_through_unquoted() {
        let template = ComponentKind::Queue
            .template(TemplateFamily::Search)
            .unwrap();
        let mut subs = Substitutions::new();
        subs.insert(Placeholder::AddressName, "*".to_string());
        let address = resolve(template, &subs, Some("amq-broker")).unwrap();
        assert!(address.contains("address=*,subcomponent=queues,*"));
    }

    #[test]
    fn complete_substitution_leaves_no_tokens() {
        let template = ComponentKind::QueueDetails
            .template(TemplateFamily::List)
            .unwrap();
        let mut subs = Substitutions::new();
        subs.insert(Placeholder::AddressName, "\"orders\"".to_string());
        subs.insert(Placeholder::QueueName, "\"orders\"".to_string());
        subs.insert(Placeholder::RoutingType, "\"anycast\"".to_string());
        let address = resolve(template, &subs, Some("amq-broker")).unwrap();
        for placeholder in Placeholder::ALL {
            assert!(!address.contains(placeholder.token()));
        }
    }

    #[test]
    fn missing_substitution_is_an_error() {
        let template = ComponentKind::Queue
            .template(TemplateFamily::Search)
            .unwrap();
        let err = resolve(template, &Substitutions::new(), Some("amq-broker")).unwrap_err();
        match err {
            ResolveError::UnresolvedPlaceholder { token, .. } => {
                assert_eq!(token, "ADDRESS_NAME")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn search_kinds_have_no_list_template() {
        let err = ComponentKind::Broker
            .template(TemplateFamily::List)
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingTemplate { .. }));
    }
}
