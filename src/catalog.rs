use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use rust_decimal::Decimal;

use crate::limits::*;
use crate::model::Service;

/// Read-only service list, looked up by id. Order is the configured order.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    services: Vec<Service>,
    by_id: HashMap<String, usize>,
}

impl ServiceCatalog {
    pub fn new(services: Vec<Service>) -> Result<Self, CatalogError> {
        if services.is_empty() {
            return Err(CatalogError::Empty);
        }
        if services.len() > MAX_SERVICES {
            return Err(CatalogError::Invalid {
                id: String::new(),
                reason: "too many services",
            });
        }
        let mut by_id = HashMap::with_capacity(services.len());
        for (idx, s) in services.iter().enumerate() {
            if s.id.trim().is_empty() {
                return Err(CatalogError::Invalid {
                    id: s.id.clone(),
                    reason: "empty id",
                });
            }
            if s.duration_minutes <= 0 || s.duration_minutes > MAX_SERVICE_MINUTES {
                return Err(CatalogError::Invalid {
                    id: s.id.clone(),
                    reason: "duration out of range",
                });
            }
            if s.base_price.is_sign_negative() {
                return Err(CatalogError::Invalid {
                    id: s.id.clone(),
                    reason: "negative price",
                });
            }
            if by_id.insert(s.id.clone(), idx).is_some() {
                return Err(CatalogError::Duplicate(s.id.clone()));
            }
        }
        Ok(Self { services, by_id })
    }

    /// Load a JSON array of services.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
        let services: Vec<Service> =
            serde_json::from_str(&raw).map_err(|e| CatalogError::Json(e.to_string()))?;
        Self::new(services)
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.by_id.get(id).map(|&i| &self.services[i])
    }

    pub fn all(&self) -> &[Service] {
        &self.services
    }
}

impl Default for ServiceCatalog {
    /// The stock catalog: installation, maintenance and electrical repair.
    fn default() -> Self {
        let services = vec![
            Service {
                id: "ac-install".into(),
                name: "Air conditioner installation".into(),
                description: "Full installation of split or window air conditioning units.".into(),
                duration_minutes: 120,
                base_price: Decimal::new(300, 0),
            },
            Service {
                id: "ac-maintenance".into(),
                name: "Air conditioner maintenance".into(),
                description: "Cleaning, gas check and general repairs of air conditioning systems."
                    .into(),
                duration_minutes: 60,
                base_price: Decimal::new(150, 0),
            },
            Service {
                id: "electrical-repair".into(),
                name: "Residential electrical repair".into(),
                description: "Troubleshooting, rewiring, outlet and breaker installation.".into(),
                duration_minutes: 90,
                base_price: Decimal::new(200, 0),
            },
        ];
        let by_id = services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self { services, by_id }
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Empty,
    Duplicate(String),
    Invalid { id: String, reason: &'static str },
    Io(String),
    Json(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "service catalog is empty"),
            CatalogError::Duplicate(id) => write!(f, "duplicate service id: {id}"),
            CatalogError::Invalid { id, reason } => write!(f, "service {id:?}: {reason}"),
            CatalogError::Io(e) => write!(f, "cannot read service catalog: {e}"),
            CatalogError::Json(e) => write!(f, "bad service catalog JSON: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {}
