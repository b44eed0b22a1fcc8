/// VPC and subnet derivation
use tracing::debug;

use super::cidr::Ipv4Cidr;
use super::models::{LogicalId, NatGateway, Subnet, SubnetTier, Vpc};
use super::GraphError;
use crate::config::NetworkConfig;

/// Tiers laid out in every availability zone, in address order
const TIERS: [SubnetTier; 2] = [SubnetTier::Public, SubnetTier::Private];

/// Builds the VPC, its subnets and gateways
pub struct NetworkBuilder<'a> {
    config: &'a NetworkConfig,
    region: &'a str,
}

/// Zones derived from the region are suffixed `a` through `z`
pub const MAX_DERIVED_AZS: u32 = 26;

impl<'a> NetworkBuilder<'a> {
    pub fn new(config: &'a NetworkConfig, region: &'a str) -> Self {
        Self { config, region }
    }

    /// Availability zones used by the network, at most `max_azs`
    pub fn availability_zones(&self) -> Vec<String> {
        let max = self.config.max_azs as usize;
        if self.config.availability_zones.is_empty() {
            (b'a'..=b'z')
                .take(max)
                .map(|suffix| format!("{}{}", self.region, suffix as char))
                .collect()
        } else {
            self.config
                .availability_zones
                .iter()
                .take(max)
                .cloned()
                .collect()
        }
    }

    pub fn build(&self) -> Result<Vpc, GraphError> {
        let id = LogicalId::new(&self.config.id);
        let cidr: Ipv4Cidr = self.config.cidr.parse()?;
        let zones = self.availability_zones();
        if zones.is_empty() {
            return Err(GraphError::NoAvailabilityZones);
        }

        let blocks = cidr.split(zones.len() * TIERS.len())?;
        let mut blocks = blocks.into_iter();

        let mut public_subnets = Vec::new();
        let mut private_subnets = Vec::new();
        for tier in TIERS {
            for (index, zone) in zones.iter().enumerate() {
                let block = blocks
                    .next()
                    .ok_or(GraphError::SubnetCountMismatch {
                        zones: zones.len(),
                        subnets: public_subnets.len() + private_subnets.len(),
                    })?;
                let subnet = Subnet {
                    id: id.child(&format!("{}Subnet{}", tier, index + 1)),
                    tier,
                    availability_zone: zone.clone(),
                    cidr: block,
                };
                debug!(
                    "Subnet {} ({}) in {}: {}",
                    subnet.id, tier, zone, subnet.cidr
                );
                match tier {
                    SubnetTier::Public => public_subnets.push(subnet),
                    SubnetTier::Private => private_subnets.push(subnet),
                }
            }
        }

        // One NAT gateway per zone, in that zone's public subnet
        let nat_gateways = public_subnets
            .iter()
            .zip(private_subnets.iter())
            .map(|(public, private)| NatGateway {
                id: public.id.child("NATGateway"),
                subnet: public.id.clone(),
                serves: private.id.clone(),
            })
            .collect();

        Ok(Vpc {
            internet_gateway: id.child("IGW"),
            id,
            cidr,
            availability_zones: zones,
            public_subnets,
            private_subnets,
            nat_gateways,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(cidr: &str, max_azs: u32) -> NetworkConfig {
        NetworkConfig {
            id: "demoVpc".to_string(),
            cidr: cidr.to_string(),
            max_azs,
            availability_zones: vec![],
        }
    }

    #[test]
    fn test_zones_derived_from_region() {
        let config = network("192.100.0.0/16", 2);
        let builder = NetworkBuilder::new(&config, "eu-west-1");
        assert_eq!(builder.availability_zones(), vec!["eu-west-1a", "eu-west-1b"]);
    }

    #[test]
    fn test_explicit_zones_are_capped() {
        let mut config = network("192.100.0.0/16", 2);
        config.availability_zones = vec![
            "us-east-1c".to_string(),
            "us-east-1d".to_string(),
            "us-east-1f".to_string(),
        ];
        let builder = NetworkBuilder::new(&config, "us-east-1");
        assert_eq!(builder.availability_zones(), vec!["us-east-1c", "us-east-1d"]);
    }

    #[test]
    fn test_subnet_layout() {
        let config = network("192.100.0.0/16", 2);
        let vpc = NetworkBuilder::new(&config, "us-east-1").build().unwrap();

        assert_eq!(vpc.public_subnets.len(), 2);
        assert_eq!(vpc.private_subnets.len(), 2);

        let public: Vec<String> = vpc.public_subnets.iter().map(|s| s.cidr.to_string()).collect();
        let private: Vec<String> = vpc.private_subnets.iter().map(|s| s.cidr.to_string()).collect();
        assert_eq!(public, vec!["192.100.0.0/18", "192.100.64.0/18"]);
        assert_eq!(private, vec!["192.100.128.0/18", "192.100.192.0/18"]);

        assert_eq!(vpc.public_subnets[1].id.as_str(), "demoVpcPublicSubnet2");
        assert_eq!(vpc.private_subnets[0].availability_zone, "us-east-1a");
        assert!(vpc.subnets().all(|s| vpc.cidr.contains(&s.cidr)));
    }

    #[test]
    fn test_nat_gateway_per_zone() {
        let config = network("10.0.0.0/16", 3);
        let vpc = NetworkBuilder::new(&config, "us-east-1").build().unwrap();
        assert_eq!(vpc.nat_gateways.len(), 3);
        for (nat, private) in vpc.nat_gateways.iter().zip(vpc.private_subnets.iter()) {
            assert_eq!(nat.serves, private.id);
        }
    }

    #[test]
    fn test_range_too_small() {
        let config = network("10.0.0.0/31", 2);
        let result = NetworkBuilder::new(&config, "us-east-1").build();
        assert!(matches!(result, Err(GraphError::Cidr(_))));
    }
}
