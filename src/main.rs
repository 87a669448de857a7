//! CLI interface for the classifier

use anchor_knn::dataset::parse_point;
use anchor_knn::{
    AnchorStrategy, ClassifierParams, Dataset, Euclidean, ExhaustiveKnn, FastKnn, Method,
    ModelSnapshot, SnapshotManager, StdRandom,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anchor-knn")]
#[command(about = "k-NN classification with anchor-indexed search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a classifier from a dataset file and save it
    Train {
        /// Dataset file, one `label,x1,x2,...` per line
        #[arg(long)]
        data: String,
        /// Directory to write the model snapshot to
        #[arg(long)]
        model: String,
        /// Number of anchors
        #[arg(long, default_value = "10")]
        anchors: usize,
        /// Seed for anchor selection
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Classify a point with a saved model
    Classify {
        /// Directory holding the model snapshot
        #[arg(long)]
        model: String,
        /// Point as comma-separated values (e.g., "1.0,2.0")
        #[arg(long)]
        point: String,
        /// Number of neighbors
        #[arg(short, long, default_value = "1")]
        k: usize,
        /// Aggregation method
        #[arg(long, default_value = "mode")]
        method: String,
    },
    /// Train on one dataset and report accuracy on another
    Evaluate {
        #[arg(long)]
        train: String,
        #[arg(long)]
        test: String,
        #[arg(short, long, default_value = "1")]
        k: usize,
        #[arg(long, default_value = "10")]
        anchors: usize,
        #[arg(long)]
        seed: Option<u64>,
        /// Also compare every prediction against a brute-force scan
        #[arg(long)]
        verify: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
        /// Start from a saved model instead of an empty classifier
        #[arg(long)]
        model: Option<String>,
        #[arg(long, default_value = "10")]
        anchors: usize,
    },
}

fn params(anchors: usize, seed: Option<u64>) -> ClassifierParams {
    ClassifierParams {
        num_anchors: anchors,
        seed,
    }
}

fn load_model(dir: &str) -> Result<FastKnn<String>> {
    let manager = SnapshotManager::new(dir)?;
    let snapshot: ModelSnapshot<String> = manager
        .load()?
        .with_context(|| format!("no model found in {}", dir))?;
    Ok(FastKnn::from_snapshot(
        snapshot,
        Euclidean,
        StdRandom::from_entropy(),
    )?)
}

fn train(data: &str, model: &str, anchors: usize, seed: Option<u64>) -> Result<()> {
    let dataset = Dataset::load(data).with_context(|| format!("reading {}", data))?;
    let mut knn = FastKnn::with_params(params(anchors, seed));
    knn.insert_batch(dataset.points.view(), &dataset.labels)?;
    knn.select_anchors(AnchorStrategy::Random);

    SnapshotManager::new(model)?.save(&knn.to_snapshot())?;
    println!(
        "Trained on {} points ({} anchors), saved to {}",
        knn.len(),
        knn.anchors().len(),
        model
    );
    Ok(())
}

fn classify(model: &str, point: &str, k: usize, method: &str) -> Result<()> {
    let mut knn = load_model(model)?;
    let point = parse_point(point)?;
    let method: Method = method.parse()?;

    let neighbors = knn.neighbors(point.view(), k)?;
    let label = method
        .aggregate(neighbors.iter().map(|n| &knn.labels()[n.index]))
        .context("no neighbors found")?;

    println!("Predicted label: {}", label);
    for (i, n) in neighbors.iter().enumerate() {
        println!(
            "{}. #{} {} (distance: {:.4})",
            i + 1,
            n.index,
            knn.labels()[n.index],
            n.distance
        );
    }
    Ok(())
}

fn evaluate(
    train: &str,
    test: &str,
    k: usize,
    anchors: usize,
    seed: Option<u64>,
    verify: bool,
) -> Result<()> {
    let train_set = Dataset::load(train).with_context(|| format!("reading {}", train))?;
    let test_set = Dataset::load(test).with_context(|| format!("reading {}", test))?;

    let mut knn = FastKnn::with_params(params(anchors, seed));
    knn.insert_batch(train_set.points.view(), &train_set.labels)?;

    let predictions = knn.query_batch(test_set.points.view(), k, Method::Mode)?;
    let correct = predictions
        .iter()
        .zip(&test_set.labels)
        .filter(|(p, t)| p == t)
        .count();
    println!(
        "Accuracy: {}/{} ({:.2}%)",
        correct,
        test_set.len(),
        100.0 * correct as f64 / test_set.len().max(1) as f64
    );

    if verify {
        let mut reference = ExhaustiveKnn::new();
        reference.insert_batch(train_set.points.view(), &train_set.labels)?;
        let mut agree = 0;
        for (row, predicted) in test_set.points.rows().into_iter().zip(&predictions) {
            if reference.query(row, k, Method::Mode)? == *predicted {
                agree += 1;
            }
        }
        println!("Agreement with brute force: {}/{}", agree, test_set.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            model,
            anchors,
            seed,
        } => train(&data, &model, anchors, seed),
        Commands::Classify {
            model,
            point,
            k,
            method,
        } => classify(&model, &point, k, &method),
        Commands::Evaluate {
            train,
            test,
            k,
            anchors,
            seed,
            verify,
        } => evaluate(&train, &test, k, anchors, seed, verify),
        Commands::Serve {
            addr,
            model,
            anchors,
        } => {
            let classifier = match model {
                Some(dir) => load_model(&dir)?,
                None => FastKnn::new(anchors),
            };
            info!(points = classifier.len(), "starting server");
            anchor_knn::server::serve(&addr, classifier).await
        }
    }
}
