//! Seed the demo habitats and animals, then print each animal's food
//! recommendation.
//!
//! Usage: seed_zoo [--dry-run]
//!
//! `--dry-run` seeds a throwaway in-memory database instead of
//! ARCADIA_DATABASE_PATH.

use arcadia::access::{Caller, Role};
use arcadia::config::Config;
use arcadia::db::{migrations, Database};
use arcadia::models::{AnimalCreate, HabitatCreate, HealthRecordCreate};
use arcadia::tools::{animals, feeding, habitats, health};

const SEED_ADMIN_ID: i64 = 1;
const SEED_VET_ID: i64 = 2;

struct SeedAnimal {
    name: &'static str,
    species: &'static str,
    status: &'static str,
    habitat: &'static str,
    age: f64,
    weight: f64,
    activity: &'static str,
}

const HABITATS: [(&str, &str); 3] = [
    ("Savanna", "A grassy plain with few trees"),
    ("Rainforest", "A dense forest with high rainfall"),
    ("Desert", "A dry area with little vegetation"),
];

const ANIMALS: [SeedAnimal; 8] = [
    SeedAnimal { name: "Leo", species: "Lion", status: "Healthy", habitat: "Savanna", age: 5.0, weight: 190.5, activity: "High" },
    SeedAnimal { name: "Ella", species: "Elephant", status: "Healthy", habitat: "Savanna", age: 15.0, weight: 4500.0, activity: "Medium" },
    SeedAnimal { name: "Zara", species: "Zebra", status: "Healthy", habitat: "Savanna", age: 7.0, weight: 350.0, activity: "High" },
    SeedAnimal { name: "Tina", species: "Toucan", status: "Healthy", habitat: "Rainforest", age: 3.0, weight: 0.5, activity: "Medium" },
    SeedAnimal { name: "Cleo", species: "Cheetah", status: "Injured", habitat: "Savanna", age: 4.0, weight: 50.0, activity: "Low" },
    SeedAnimal { name: "Daisy", species: "Dolphin", status: "Healthy", habitat: "Savanna", age: 8.0, weight: 300.0, activity: "High" },
    SeedAnimal { name: "Rex", species: "Crocodile", status: "Healthy", habitat: "Rainforest", age: 12.0, weight: 450.0, activity: "Low" },
    SeedAnimal { name: "Sandy", species: "Camel", status: "Healthy", habitat: "Desert", age: 6.0, weight: 500.0, activity: "Medium" },
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dry_run = std::env::args().any(|arg| arg == "--dry-run");
    let config = Config::from_env()?;

    let database = if dry_run {
        println!("Dry run: seeding an in-memory database");
        Database::in_memory()?
    } else {
        println!("Database path: {}", config.database_path.display());
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let database = Database::new(&config.database_path)?;
        database.with_conn_mut(migrations::run_migrations)?;
        database
    };

    let rules = config.load_rules()?;
    let admin = Caller::new(Some(SEED_ADMIN_ID), Role::Administrator);
    let vet = Caller::new(Some(SEED_VET_ID), Role::Veterinarian);

    if animals::list_animals(&database, &admin, None)?.total > 0 {
        println!("Animals already present, nothing seeded");
    } else {
        let mut habitat_ids = Vec::new();
        for (name, description) in HABITATS {
            let habitat = habitats::add_habitat(
                &database,
                &admin,
                HabitatCreate {
                    name: name.to_string(),
                    description: description.to_string(),
                    image: format!("{}.jpg", name.to_lowercase()),
                },
            )?;
            println!("Habitat {:>2}: {}", habitat.id, habitat.name);
            habitat_ids.push((name, habitat.id));
        }

        for seed in &ANIMALS {
            let habitat_id = habitat_ids
                .iter()
                .find(|(name, _)| *name == seed.habitat)
                .map(|(_, id)| *id);
            let detail = animals::add_animal(
                &database,
                &admin,
                AnimalCreate {
                    name: seed.name.to_string(),
                    species: seed.species.to_string(),
                    image: format!("{}.jpg", seed.species.to_lowercase()),
                    status: seed.status.to_string(),
                    age: seed.age,
                    weight: seed.weight,
                    activity_level: seed.activity.to_string(),
                    dietary_needs: None,
                    habitat_id,
                },
            )?;
            println!("Animal  {:>2}: {} the {}", detail.animal.id, detail.animal.name, detail.animal.species);
        }

        let leo = animals::list_animals(&database, &admin, None)?
            .animals
            .into_iter()
            .find(|a| a.name == "Leo");
        if let Some(leo) = leo {
            health::add_health_record(
                &database,
                &vet,
                HealthRecordCreate {
                    animal_id: leo.id,
                    date: chrono::Local::now().format("%Y-%m-%d").to_string(),
                    status: "Healthy".to_string(),
                    food: "Meat".to_string(),
                    quantity: 5000.0,
                    ..Default::default()
                },
            )?;
            println!("Health record added for Leo");
        }
    }

    println!();
    println!("{:<8} {:<10} {:>10} {:>10}", "Name", "Species", "Computed", "Stored");
    let listed = feeding::list_food_recommendations(&database, &rules, &vet)?;
    for row in &listed.recommendations {
        let stored = row
            .stored_grams
            .map(|g| format!("{:.0} g", g))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<10} {:>8} g {:>10}",
            row.name, row.species, row.computed_grams, stored
        );
    }
    println!("Total per day: {:.0} g for {} animals", listed.total_effective_grams, listed.total);

    Ok(())
}
