// src/seed.rs
//! Demo data written on first start: three campuses with their labs, one
//! account per role and a few inventory items.

use anyhow::Context;
use rand::{distributions::Alphanumeric, seq::SliceRandom, thread_rng, Rng};
use sqlx::SqlitePool;

use crate::auth::{AuthService, NewUser, User, UserRole};
use crate::config::SeedConfig;
use crate::models::{CreateCampusRequest, CreateInventoryItemRequest, CreateLabRequest, Money};
use crate::repositories::{CampusRepository, InventoryRepository, LabRepository, Repository};

struct SeedCampus {
    name: &'static str,
    location: &'static str,
    email: &'static str,
    budget: f64,
}

struct SeedLab {
    name: &'static str,
    description: &'static str,
    capacity: i64,
    location: &'static str,
    equipment: &'static [&'static str],
    hourly_rate: f64,
    /// Index into CAMPUSES
    campus: usize,
}

struct SeedItem {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    total: i64,
    available: i64,
    unit_cost: f64,
    supplier: &'static str,
    /// Index into LABS
    lab: usize,
}

const CAMPUSES: &[SeedCampus] = &[
    SeedCampus { name: "Main Campus", location: "Downtown", email: "main@university.edu", budget: 100000.0 },
    SeedCampus { name: "North Campus", location: "North District", email: "north@university.edu", budget: 75000.0 },
    SeedCampus { name: "South Campus", location: "South District", email: "south@university.edu", budget: 50000.0 },
];

const LABS: &[SeedLab] = &[
    SeedLab {
        name: "Computer Lab A",
        description: "High-performance computing lab",
        capacity: 30,
        location: "Building A, Floor 2",
        equipment: &["30 Desktop PCs", "1 Projector", "1 Whiteboard", "Network Switch"],
        hourly_rate: 25.0,
        campus: 0,
    },
    SeedLab {
        name: "Chemistry Lab",
        description: "Organic chemistry laboratory",
        capacity: 20,
        location: "Building B, Floor 1",
        equipment: &["20 Lab Benches", "Fume Hoods", "Chemical Storage", "Safety Equipment"],
        hourly_rate: 35.0,
        campus: 0,
    },
    SeedLab {
        name: "Physics Lab",
        description: "General physics experiments",
        capacity: 25,
        location: "Building C, Floor 3",
        equipment: &["Oscilloscopes", "Function Generators", "Multimeters", "Lab Benches"],
        hourly_rate: 30.0,
        campus: 1,
    },
    SeedLab {
        name: "Biology Lab",
        description: "Microbiology and cell culture",
        capacity: 15,
        location: "Building D, Floor 1",
        equipment: &["Microscopes", "Incubators", "Centrifuges", "Biosafety Cabinets"],
        hourly_rate: 40.0,
        campus: 2,
    },
];

/// (username, role, index into CAMPUSES)
const USERS: &[(&str, UserRole, Option<usize>)] = &[
    ("admin", UserRole::Admin, None),
    ("manager1", UserRole::Manager, Some(0)),
    ("student1", UserRole::User, Some(0)),
];

const ITEMS: &[SeedItem] = &[
    SeedItem {
        name: "Desktop PC",
        description: "High-performance desktop computer",
        category: "Computing",
        total: 30,
        available: 28,
        unit_cost: 800.0,
        supplier: "TechCorp",
        lab: 0,
    },
    SeedItem {
        name: "Microscope",
        description: "Digital microscope with camera",
        category: "Optics",
        total: 10,
        available: 9,
        unit_cost: 1200.0,
        supplier: "ScienceEquip",
        lab: 3,
    },
    SeedItem {
        name: "Oscilloscope",
        description: "Digital storage oscilloscope",
        category: "Electronics",
        total: 8,
        available: 7,
        unit_cost: 2500.0,
        supplier: "ElectroTools",
        lab: 2,
    },
];

/// Password with at least one letter and one digit, as the strength check
/// requires.
fn generate_password() -> String {
    let mut rng = thread_rng();
    let mut chars: Vec<char> = (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    chars.push(char::from(b'a' + rng.gen_range(0..26)));
    chars.push(char::from(b'0' + rng.gen_range(0..10)));
    chars.shuffle(&mut rng);
    chars.into_iter().collect()
}

/// Writes the demo data unless a campus already exists. Returns whether
/// anything was written.
pub async fn seed_if_empty(
    pool: &SqlitePool,
    auth_service: &AuthService,
    config: &SeedConfig,
) -> anyhow::Result<bool> {
    if CampusRepository.count(pool).await? > 0 {
        log::info!("Seed skipped: campuses already present");
        return Ok(false);
    }

    let password = match &config.password {
        Some(password) => password.clone(),
        None => {
            let generated = generate_password();
            log::warn!("Seed accounts use generated password: {}", generated);
            generated
        }
    };

    let mut tx = pool.begin().await?;

    let mut campus_ids = Vec::with_capacity(CAMPUSES.len());
    for campus in CAMPUSES {
        let created = CampusRepository
            .create(
                &mut *tx,
                CreateCampusRequest {
                    name: campus.name.to_string(),
                    location: campus.location.to_string(),
                    contact_email: Some(campus.email.to_string()),
                    contact_phone: None,
                    budget_allocated: Some(Money::from_major(campus.budget)),
                },
            )
            .await
            .with_context(|| format!("Failed to seed campus '{}'", campus.name))?;
        campus_ids.push(created.id);
    }

    let mut lab_ids = Vec::with_capacity(LABS.len());
    for lab in LABS {
        let created = LabRepository
            .create(
                &mut *tx,
                CreateLabRequest {
                    name: lab.name.to_string(),
                    description: Some(lab.description.to_string()),
                    capacity: lab.capacity,
                    location: Some(lab.location.to_string()),
                    equipment_list: lab.equipment.iter().map(|e| e.to_string()).collect(),
                    hourly_rate: Some(Money::from_major(lab.hourly_rate)),
                    campus_id: campus_ids[lab.campus],
                    status: None,
                },
            )
            .await
            .with_context(|| format!("Failed to seed lab '{}'", lab.name))?;
        lab_ids.push(created.id);
    }

    for (username, role, campus) in USERS {
        let password_hash = auth_service
            .hash_password(&password)
            .context("Seed password rejected")?;
        let new_user = NewUser {
            username: username.to_string(),
            email: format!("{}@university.edu", username),
            password: String::new(),
            role: *role,
            campus_id: campus.map(|index| campus_ids[index]),
        };
        User::insert(&mut *tx, new_user, password_hash)
            .await
            .with_context(|| format!("Failed to seed user '{}'", username))?;
    }

    for item in ITEMS {
        InventoryRepository
            .create(
                &mut *tx,
                CreateInventoryItemRequest {
                    name: item.name.to_string(),
                    description: Some(item.description.to_string()),
                    category: Some(item.category.to_string()),
                    quantity_total: item.total,
                    quantity_available: Some(item.available),
                    unit_cost: Some(Money::from_major(item.unit_cost)),
                    supplier: Some(item.supplier.to_string()),
                    purchase_date: None,
                    warranty_expiry: None,
                    lab_id: lab_ids[item.lab],
                    status: None,
                },
            )
            .await
            .with_context(|| format!("Failed to seed inventory item '{}'", item.name))?;
    }

    tx.commit().await?;

    log::info!(
        "Seeded {} campuses, {} labs, {} users, {} inventory items",
        CAMPUSES.len(), LABS.len(), USERS.len(), ITEMS.len()
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::test_support::memory_pool;
    use crate::models::LabFilter;

    #[test]
    fn test_generated_password_is_strong_enough() {
        for _ in 0..20 {
            let password = generate_password();
            assert_eq!(password.len(), 12);
            assert!(password.chars().any(|c| c.is_ascii_alphabetic()));
            assert!(password.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[actix_rt::test]
    async fn test_seed_once() {
        let pool = memory_pool().await;
        let config = Config::for_tests();
        let auth_service = AuthService::new(&config.auth);
        let seed_config = SeedConfig { enabled: true, password: Some("campus2024".to_string()) };

        assert!(seed_if_empty(&pool, &auth_service, &seed_config).await.unwrap());
        assert!(!seed_if_empty(&pool, &auth_service, &seed_config).await.unwrap());

        assert_eq!(CampusRepository.count(&pool).await.unwrap(), 3);
        assert_eq!(LabRepository.count(&pool).await.unwrap(), 4);
        assert_eq!(InventoryRepository.count(&pool).await.unwrap(), 3);

        let labs = LabRepository.list(&pool, &LabFilter::default()).await.unwrap();
        assert_eq!(labs[3].lab.name, "Biology Lab");
        assert_eq!(labs[3].campus_name, "South Campus");
        assert_eq!(labs[3].lab.hourly_rate, Money::from_major(40.0));

        let manager = User::find_by_username(&pool, "manager1").await.unwrap();
        assert_eq!(manager.get_role(), UserRole::Manager);
        assert_eq!(manager.campus_id, Some(labs[0].lab.campus_id));
        assert!(auth_service.verify_password("campus2024", &manager.password_hash).unwrap());

        let admin = User::find_by_username(&pool, "admin").await.unwrap();
        assert_eq!(admin.campus_id, None);
    }

    #[actix_rt::test]
    async fn test_weak_seed_password_writes_nothing() {
        let pool = memory_pool().await;
        let config = Config::for_tests();
        let auth_service = AuthService::new(&config.auth);
        let seed_config = SeedConfig { enabled: true, password: Some("short".to_string()) };

        assert!(seed_if_empty(&pool, &auth_service, &seed_config).await.is_err());
        assert_eq!(CampusRepository.count(&pool).await.unwrap(), 0);
    }
}
