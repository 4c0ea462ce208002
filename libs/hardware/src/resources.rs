//! The five-dimensional resource vector shared by capacity, usage and demand.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// One of the five schedulable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Cpu,
    Ram,
    Gpu,
    Disk,
    Network,
}

impl Resource {
    /// All resources in wire order.
    pub const ALL: [Resource; 5] = [
        Resource::Cpu,
        Resource::Ram,
        Resource::Gpu,
        Resource::Disk,
        Resource::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Ram => "ram",
            Resource::Gpu => "gpu",
            Resource::Disk => "disk",
            Resource::Network => "network",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amounts of each resource, in the order cpu, ram, gpu, disk, network.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: f64,
    pub ram: f64,
    pub gpu: f64,
    pub disk: f64,
    pub network: f64,
}

impl Resources {
    pub const ZERO: Resources = Resources::splat(0.0);

    #[must_use]
    pub const fn new(cpu: f64, ram: f64, gpu: f64, disk: f64, network: f64) -> Self {
        Self {
            cpu,
            ram,
            gpu,
            disk,
            network,
        }
    }

    /// Same amount for every resource.
    #[must_use]
    pub const fn splat(value: f64) -> Self {
        Self::new(value, value, value, value, value)
    }

    #[must_use]
    pub fn get(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Ram => self.ram,
            Resource::Gpu => self.gpu,
            Resource::Disk => self.disk,
            Resource::Network => self.network,
        }
    }

    /// Builds a vector by evaluating `f` once per resource.
    #[must_use]
    pub fn from_fn(mut f: impl FnMut(Resource) -> f64) -> Self {
        Self::new(
            f(Resource::Cpu),
            f(Resource::Ram),
            f(Resource::Gpu),
            f(Resource::Disk),
            f(Resource::Network),
        )
    }

    /// Componentwise combination of two vectors.
    #[must_use]
    pub fn zip_with(&self, other: &Resources, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        Self::from_fn(|r| f(self.get(r), other.get(r)))
    }

    /// Componentwise product, e.g. nominal demand times scale factors.
    #[must_use]
    pub fn mul_each(&self, factors: &Resources) -> Self {
        self.zip_with(factors, |a, b| a * b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        Resource::ALL.into_iter().map(move |r| (r, self.get(r)))
    }

    /// True when every component is finite and not negative.
    #[must_use]
    pub fn is_valid_demand(&self) -> bool {
        self.iter().all(|(_, v)| v.is_finite() && v >= 0.0)
    }
}

impl From<[f64; 5]> for Resources {
    fn from(v: [f64; 5]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4])
    }
}

impl Add for Resources {
    type Output = Resources;

    fn add(self, rhs: Resources) -> Resources {
        self.zip_with(&rhs, |a, b| a + b)
    }
}

impl AddAssign for Resources {
    fn add_assign(&mut self, rhs: Resources) {
        *self = *self + rhs;
    }
}

impl Sub for Resources {
    type Output = Resources;

    fn sub(self, rhs: Resources) -> Resources {
        self.zip_with(&rhs, |a, b| a - b)
    }
}

impl SubAssign for Resources {
    fn sub_assign(&mut self, rhs: Resources) {
        *self = *self - rhs;
    }
}

impl Neg for Resources {
    type Output = Resources;

    fn neg(self) -> Resources {
        Self::from_fn(|r| -self.get(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_flips_every_component() {
        let v = Resources::new(1.0, -2.0, 3.0, -4.0, 5.0);
        assert_eq!(-v, Resources::new(-1.0, 2.0, -3.0, 4.0, -5.0));
    }

    #[test]
    fn test_add_then_subtract_restores() {
        let mut usage = Resources::new(20.0, 30.0, 40.0, 0.0, 50.0);
        let demand = Resources::new(2.0, 3.0, 5.0, 7.0, 11.0);
        usage += demand;
        assert_eq!(usage, Resources::new(22.0, 33.0, 45.0, 7.0, 61.0));
        usage -= demand;
        assert_eq!(usage, Resources::new(20.0, 30.0, 40.0, 0.0, 50.0));
    }

    #[test]
    fn test_mul_each() {
        let demand = Resources::new(2.0, 3.0, 5.0, 7.0, 11.0);
        let factors = Resources::new(0.5, 1.0, 0.0, 2.0, 1.0);
        assert_eq!(
            demand.mul_each(&factors),
            Resources::new(1.0, 3.0, 0.0, 14.0, 11.0)
        );
    }

    #[test]
    fn test_demand_validation() {
        assert!(Resources::new(0.0, 1.0, 2.0, 3.0, 4.0).is_valid_demand());
        assert!(!Resources::new(-1.0, 1.0, 2.0, 3.0, 4.0).is_valid_demand());
        assert!(!Resources::new(f64::NAN, 1.0, 2.0, 3.0, 4.0).is_valid_demand());
        assert!(!Resources::new(f64::INFINITY, 1.0, 2.0, 3.0, 4.0).is_valid_demand());
    }

    #[test]
    fn test_wire_order() {
        let v = Resources::from([1.0, 2.0, 3.0, 4.0, 5.0]);
        let names: Vec<_> = v.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(names, ["cpu", "ram", "gpu", "disk", "network"]);
        assert_eq!(v, Resources::new(1.0, 2.0, 3.0, 4.0, 5.0));
    }
}
