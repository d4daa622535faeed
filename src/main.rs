use anyhow::Result;
use chrono::{Duration, Utc};
use clearance_ranking::{
    ActionType, Config, Evaluator, HybridRecommender, Interaction, Product,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Seed for the demo dataset, fixed so repeated runs are comparable.
const SAMPLE_SEED: u64 = 42;
const SAMPLE_USERS: usize = 25;
const SAMPLE_INTERACTIONS: usize = 1000;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env()?;

    let (catalog, interactions) = generate_sample_data();
    info!(
        products = catalog.len(),
        interactions = interactions.len(),
        "Generated sample clearance data"
    );

    let engine = HybridRecommender::new(&catalog, &interactions, config.clone());

    let user_id = "staff_0";
    let recommendations = engine.recommend(user_id, 10);
    info!(user_id, count = recommendations.len(), "Top recommendations");
    for rec in &recommendations {
        info!(
            product_id = %rec.product.product_id,
            name = %rec.product.name,
            category = %rec.product.category,
            score = rec.recommendation_score,
            days_to_expiry = rec.derived.days_to_expiry,
            discount = rec.derived.discount,
            "recommended"
        );
    }

    let evaluator = Evaluator::new(catalog, interactions, config);
    let report = evaluator.evaluate(5);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Synthetic clearance-aisle dataset: five retail categories with four
/// variants per item name, random prices/expiries/stock, and a weighted
/// mix of staff interactions.
fn generate_sample_data() -> (Vec<Product>, Vec<Interaction>) {
    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    let now = Utc::now();

    let categories: [(&str, [&str; 5]); 5] = [
        (
            "Skincare",
            ["Face Cream", "Moisturizer", "Sunscreen", "Anti-aging Serum", "Cleanser"],
        ),
        (
            "Health",
            ["Vitamin C", "Pain Relief", "Multivitamin", "Protein Powder", "First Aid"],
        ),
        (
            "Haircare",
            ["Shampoo", "Conditioner", "Hair Oil", "Hair Mask", "Styling Gel"],
        ),
        (
            "Oral Care",
            ["Toothpaste", "Mouthwash", "Dental Floss", "Whitening Strips", "Toothbrush"],
        ),
        (
            "Personal Care",
            ["Hand Sanitizer", "Body Wash", "Deodorant", "Lotion", "Soap"],
        ),
    ];

    let mut catalog = Vec::new();
    let mut product_id = 0u32;
    for (category, items) in &categories {
        for item in items {
            for variant in 1..=4 {
                let price = (rng.gen_range(5.0..50.0) * 100.0f64).round() / 100.0;
                catalog.push(Product {
                    product_id: product_id.to_string(),
                    name: format!("{item} {variant}"),
                    category: category.to_string(),
                    price,
                    stock: rng.gen_range(0..100),
                    expiry_date: now + Duration::days(rng.gen_range(1..180)),
                });
                product_id += 1;
            }
        }
    }

    let mut interactions = Vec::new();
    for _ in 0..SAMPLE_INTERACTIONS {
        let user = format!("staff_{}", rng.gen_range(0..SAMPLE_USERS));
        let product = rng.gen_range(0..catalog.len()).to_string();
        // viewed 40%, added 30%, skipped 10%, bought 20%
        let roll: f64 = rng.gen();
        let action = if roll < 0.4 {
            ActionType::Viewed
        } else if roll < 0.7 {
            ActionType::Added
        } else if roll < 0.8 {
            ActionType::Skipped
        } else {
            ActionType::Bought
        };
        interactions.push(Interaction {
            user_id: user,
            product_id: product,
            action_type: action,
            timestamp: now - Duration::days(rng.gen_range(0..60)),
            quantity: (action == ActionType::Bought).then(|| rng.gen_range(1..5)),
        });
    }

    (catalog, interactions)
}
