/// Security groups and the connections between them
use tracing::debug;

use super::models::{IngressRule, LogicalId, Peer, Port, SecurityGroup};

impl SecurityGroup {
    /// Create an empty security group in a VPC, with all outbound traffic allowed
    pub fn new(id: LogicalId, vpc: &LogicalId, description: impl Into<String>) -> Self {
        Self {
            id,
            vpc: vpc.clone(),
            description: description.into(),
            ingress: Vec::new(),
            allow_all_outbound: true,
        }
    }

    /// Add an ingress rule, skipping exact duplicates
    pub fn add_ingress_rule(&mut self, peer: Peer, port: Port, description: impl Into<String>) {
        let rule = IngressRule {
            peer,
            port,
            description: description.into(),
        };
        if self
            .ingress
            .iter()
            .any(|r| r.peer == rule.peer && r.port == rule.port)
        {
            debug!("Ingress {} from {} already present on {}", port, rule.peer, self.id);
            return;
        }
        debug!("Ingress {} from {} on {}", port, rule.peer, self.id);
        self.ingress.push(rule);
    }

    /// Whether `peer` may reach `port`
    #[cfg(test)]
    pub fn allows(&self, peer: &Peer, port: Port) -> bool {
        self.ingress.iter().any(|r| &r.peer == peer && r.port == port)
    }

    /// Every peer allowed on `port`
    pub fn peers_on(&self, port: Port) -> Vec<&Peer> {
        self.ingress
            .iter()
            .filter(|r| r.port == port)
            .map(|r| &r.peer)
            .collect()
    }
}

/// Network reachability of a set of security groups, with a default port
pub struct Connections<'a> {
    security_groups: Vec<&'a mut SecurityGroup>,
    default_port: Port,
}

impl<'a> Connections<'a> {
    pub fn new(security_groups: Vec<&'a mut SecurityGroup>, default_port: Port) -> Self {
        Self {
            security_groups,
            default_port,
        }
    }

    /// Allow traffic from another security group on `port`
    pub fn allow_from(&mut self, other: &SecurityGroup, port: Port, description: &str) {
        for group in self.security_groups.iter_mut() {
            group.add_ingress_rule(Peer::SecurityGroup(other.id.clone()), port, description);
        }
    }

    /// Allow traffic from another security group on the default port
    pub fn allow_default_port_from(&mut self, other: &SecurityGroup, description: &str) {
        let port = self.default_port;
        self.allow_from(other, port, description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str) -> SecurityGroup {
        SecurityGroup::new(LogicalId::new(id), &LogicalId::new("vpc"), id)
    }

    #[test]
    fn test_add_ingress_rule_dedupes() {
        let mut sg = group("demoSG");
        sg.add_ingress_rule(Peer::any_ipv4(), Port::tcp(80), "http");
        sg.add_ingress_rule(Peer::any_ipv4(), Port::tcp(80), "http again");
        assert_eq!(sg.ingress.len(), 1);
        assert!(sg.allows(&Peer::any_ipv4(), Port::tcp(80)));
        assert!(!sg.allows(&Peer::any_ipv4(), Port::tcp(443)));
    }

    #[test]
    fn test_connections_allow_default_port() {
        let mut cache_sg = group("demoSG");
        let service_sg = group("serviceSG");

        {
            let mut connections = Connections::new(vec![&mut cache_sg], Port::tcp(6379));
            connections.allow_default_port_from(&service_sg, "from service");
        }

        let peers = cache_sg.peers_on(Port::tcp(6379));
        assert_eq!(peers, vec![&Peer::SecurityGroup(LogicalId::new("serviceSG"))]);
    }

    #[test]
    fn test_connections_apply_to_every_group() {
        let mut a = group("a");
        let mut b = group("b");
        let source = group("source");

        Connections::new(vec![&mut a, &mut b], Port::tcp(6379)).allow_from(
            &source,
            Port::tcp(8080),
            "alt port",
        );

        let peer = Peer::SecurityGroup(LogicalId::new("source"));
        assert!(a.allows(&peer, Port::tcp(8080)));
        assert!(b.allows(&peer, Port::tcp(8080)));
        assert!(!a.allows(&peer, Port::tcp(6379)));
    }
}
