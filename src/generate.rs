//! `flatjson generate`: synthetic e-commerce orders as JSON Lines
//!
//! Records are emitted in fixed-size chunks, the shape a Firehose
//! `PutRecordBatch` producer would send.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use flatjson_config::GeneratorConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// SKU numbers are multiples of this prime
const SKU_STEP: u64 = 9973;

/// Share of orders with no customer attached
const ANONYMOUS_ORDER_RATE: f64 = 0.05;

const ORDER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    ClothingShoesAndAccessories,
    Electronics,
    BeautyAndPersonalCare,
    BooksMusicAndMovies,
    FlowersAndGifts,
}

impl Category {
    fn sku_prefix(self) -> &'static str {
        match self {
            Category::ClothingShoesAndAccessories => "CS",
            Category::Electronics => "ET",
            Category::BeautyAndPersonalCare => "BT",
            Category::BooksMusicAndMovies => "BO",
            Category::FlowersAndGifts => "FG",
        }
    }

    /// Rate of the exponential distribution SKU numbers are drawn from
    fn sku_rate(self) -> f64 {
        match self {
            Category::ClothingShoesAndAccessories => 1.0 / 3.0,
            Category::Electronics => 1.0 / 4.0,
            Category::BeautyAndPersonalCare => 1.0 / 5.0,
            Category::BooksMusicAndMovies => 1.0 / 6.0,
            Category::FlowersAndGifts => 1.0 / 2.0,
        }
    }

    /// Mean and standard deviation of the price
    fn price_distribution(self) -> (f64, f64) {
        match self {
            Category::Electronics => (500.0, 50.0),
            Category::ClothingShoesAndAccessories => (120.0, 10.0),
            Category::BeautyAndPersonalCare => (50.0, 5.0),
            Category::BooksMusicAndMovies => (30.0, 3.0),
            Category::FlowersAndGifts => (20.0, 2.0),
        }
    }
}

const CATEGORY_POPULARITY: [(Category, u32); 5] = [
    (Category::ClothingShoesAndAccessories, 44),
    (Category::Electronics, 34),
    (Category::BeautyAndPersonalCare, 29),
    (Category::BooksMusicAndMovies, 44),
    (Category::FlowersAndGifts, 14),
];

const CUSTOMERS: [(&str, u32); 5] = [
    ("AWS", 44),
    ("Amazon", 34),
    ("Whole Foods", 29),
    ("Audible", 44),
    ("Prime Video", 14),
];

/// Sampling distributions for one product category
#[derive(Debug, Clone, Copy)]
struct CategoryModel {
    category: Category,
    sku_number: Exp<f64>,
    price: Normal<f64>,
}

impl CategoryModel {
    fn new(category: Category) -> Result<Self> {
        let (mean, std_dev) = category.price_distribution();
        Ok(Self {
            category,
            sku_number: Exp::new(category.sku_rate())
                .with_context(|| format!("Invalid SKU rate for {:?}", category))?,
            price: Normal::new(mean, std_dev)
                .with_context(|| format!("Invalid price distribution for {:?}", category))?,
        })
    }
}

/// Draws from a fixed table by bisecting cumulative weights
struct WeightedChoice<T> {
    values: Vec<T>,
    cum_weights: Vec<u32>,
}

impl<T: Copy> WeightedChoice<T> {
    fn new(table: &[(T, u32)]) -> Self {
        let values = table.iter().map(|(value, _)| *value).collect();
        let cum_weights = table
            .iter()
            .scan(0u32, |total, (_, weight)| {
                *total += weight;
                Some(*total)
            })
            .collect();
        Self {
            values,
            cum_weights,
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> T {
        let total = self.cum_weights.last().copied().unwrap_or(0);
        let x = rng.gen::<f64>() * f64::from(total);
        let index = self
            .cum_weights
            .partition_point(|w| f64::from(*w) <= x)
            .min(self.values.len().saturating_sub(1));
        self.values[index]
    }
}

/// One synthetic order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub customer_id: Option<&'static str>,
    pub order_date: String,
    pub sku: String,
    pub price: f64,
}

pub struct OrderGenerator {
    rng: StdRng,
    categories: WeightedChoice<CategoryModel>,
    customers: WeightedChoice<&'static str>,
}

impl OrderGenerator {
    /// A fixed seed makes the sequence reproducible
    pub fn new(seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let categories = CATEGORY_POPULARITY
            .iter()
            .map(|(category, weight)| CategoryModel::new(*category).map(|model| (model, *weight)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rng,
            categories: WeightedChoice::new(&categories),
            customers: WeightedChoice::new(&CUSTOMERS),
        })
    }

    pub fn next_order(&mut self, now: DateTime<Utc>) -> Order {
        let customer_id = if self.rng.gen::<f64>() > ANONYMOUS_ORDER_RATE {
            Some(self.customers.sample(&mut self.rng))
        } else {
            None
        };
        let model = self.categories.sample(&mut self.rng);
        let draw = model.sku_number.sample(&mut self.rng).round_ties_even() as u64;
        let price = model.price.sample(&mut self.rng);

        Order {
            customer_id,
            order_date: now.format(ORDER_DATE_FORMAT).to_string(),
            sku: format!("{}-{}", model.category.sku_prefix(), (1 + draw) * SKU_STEP),
            price,
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Total number of orders to generate
    #[arg(long, value_name = "N")]
    pub count: Option<usize>,

    /// Orders per chunk (at most 500)
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Pause between chunks, in milliseconds
    #[arg(long, value_name = "MS")]
    pub sleep_ms: Option<u64>,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write orders to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl GenerateCommand {
    /// Command-line flags win over every other configuration source
    pub fn apply_overrides(&self, config: &mut GeneratorConfig) {
        if let Some(count) = self.count {
            config.events_count = count;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(sleep_ms) = self.sleep_ms {
            config.sleep_interval_ms = sleep_ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }

    pub fn run(&self, config: &GeneratorConfig) -> Result<usize> {
        let written = match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                write_orders(config, Utc::now, &mut BufWriter::new(file))?
            }
            None => write_orders(config, Utc::now, &mut io::stdout().lock())?,
        };
        info!(orders = written, "Generated orders");
        Ok(written)
    }
}

/// Write `events_count / chunk_size` full chunks of orders; a partial
/// trailing chunk is not emitted
pub fn write_orders<W, C>(config: &GeneratorConfig, mut clock: C, out: &mut W) -> Result<usize>
where
    W: Write,
    C: FnMut() -> DateTime<Utc>,
{
    let mut generator = OrderGenerator::new(config.seed)?;
    let chunks = config.events_count / config.chunk_size.max(1);
    let sleep = config.sleep_interval();
    let mut written = 0usize;

    for chunk in 0..chunks {
        if chunk > 0 && !sleep.is_zero() {
            std::thread::sleep(sleep);
        }

        for _ in 0..config.chunk_size {
            let order = generator.next_order(clock());
            serde_json::to_writer(&mut *out, &order).context("Failed to encode order")?;
            out.write_all(b"\n").context("Failed to write output")?;
            written += 1;
        }
        out.flush().context("Failed to flush output")?;
        debug!(chunk, records = config.chunk_size, "Wrote chunk");
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap()
    }

    fn config(events_count: usize, chunk_size: usize, seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            events_count,
            chunk_size,
            sleep_interval_ms: 0,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_seeded_output_is_deterministic() {
        let config = config(40, 8, 42);
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_orders(&config, fixed_clock, &mut first).unwrap();
        write_orders(&config, fixed_clock, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_only_full_chunks_are_written() {
        let mut out = Vec::new();
        let written = write_orders(&config(31, 10, 1), fixed_clock, &mut out).unwrap();
        assert_eq!(written, 30);
        assert_eq!(out.iter().filter(|b| **b == b'\n').count(), 30);

        let mut out = Vec::new();
        assert_eq!(write_orders(&config(9, 10, 1), fixed_clock, &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_order_shape() {
        let mut out = Vec::new();
        write_orders(&config(200, 20, 7), fixed_clock, &mut out).unwrap();

        let customers: Vec<&str> = CUSTOMERS.iter().map(|(name, _)| *name).collect();
        for line in out.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            let order: Value = serde_json::from_slice(line).unwrap();
            let keys: Vec<&String> = order.as_object().unwrap().keys().collect();
            assert_eq!(keys, vec!["customer_id", "order_date", "sku", "price"]);

            match &order["customer_id"] {
                Value::Null => {}
                Value::String(name) => assert!(customers.contains(&name.as_str())),
                other => panic!("unexpected customer_id {}", other),
            }
            assert_eq!(order["order_date"], "2024-03-09 14:05:30");

            let sku = order["sku"].as_str().unwrap();
            let (prefix, number) = sku.split_once('-').unwrap();
            assert!(["CS", "ET", "BT", "BO", "FG"].contains(&prefix));
            let number: u64 = number.parse().unwrap();
            assert!(number >= SKU_STEP);
            assert_eq!(number % SKU_STEP, 0);

            assert!(order["price"].as_f64().unwrap().is_finite());
        }
    }

    #[test]
    fn test_weighted_choice_covers_table() {
        let choice = WeightedChoice::new(&CATEGORY_POPULARITY);
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = Vec::new();
        for _ in 0..2_000 {
            let category = choice.sample(&mut rng);
            if !seen.contains(&category) {
                seen.push(category);
            }
        }
        assert_eq!(seen.len(), CATEGORY_POPULARITY.len());
    }

    #[test]
    fn test_category_models_follow_their_distributions() {
        let model = CategoryModel::new(Category::Electronics).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let prices: Vec<f64> = (0..4_000).map(|_| model.price.sample(&mut rng)).collect();
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        assert!((490.0..510.0).contains(&mean), "mean price {}", mean);

        let draws: Vec<f64> = (0..4_000).map(|_| model.sku_number.sample(&mut rng)).collect();
        assert!(draws.iter().all(|d| *d >= 0.0));
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((3.5..4.5).contains(&mean), "mean SKU draw {}", mean);
    }

    #[test]
    fn test_cli_overrides_replace_config() {
        let command = GenerateCommand {
            count: Some(5),
            chunk_size: None,
            sleep_ms: Some(0),
            seed: Some(11),
            output: None,
        };
        let mut config = GeneratorConfig::default();
        command.apply_overrides(&mut config);
        assert_eq!(config.events_count, 5);
        assert_eq!(config.chunk_size, GeneratorConfig::default().chunk_size);
        assert_eq!(config.sleep_interval_ms, 0);
        assert_eq!(config.seed, Some(11));
    }
}
