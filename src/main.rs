use std::{env, fs, sync::mpsc};

use anyhow::{Context, Result};
use log::info;
use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

use progressive_growing::{Discriminator, Generator, NetworkConfig, Progressive};

const BATCH_SIZE: usize = 4;
const BLEND_STEPS: usize = 4;

fn load_config() -> Result<NetworkConfig> {
    let Some(path) = env::args().nth(1) else {
        return Ok(NetworkConfig {
            latent_dim: 32,
            target_size: 16,
            seed: Some(42),
            ..Default::default()
        });
    };

    let json = fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
    NetworkConfig::from_json(&json).with_context(|| format!("parsing config {path}"))
}

/// Generates a batch and scores it, returns the mean score.
fn step(generator: &Generator, discriminator: &Discriminator, rng: &mut StdRng) -> Result<f32> {
    let noise = Array2::<f32>::random_using(
        (BATCH_SIZE, generator.latent_dim()),
        StandardNormal,
        rng,
    );

    let images = generator.evaluate(noise.view().into_dyn())?;
    let scores = discriminator.evaluate(images.view().into_dyn())?;
    Ok(scores.mean().unwrap_or_default())
}

fn main() -> Result<()> {
    env_logger::init();

    let config = load_config()?;
    let mut generator = Generator::new(&config)?;
    let mut discriminator = Discriminator::new(&config)?;
    let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_default());

    let (tx, rx) = mpsc::channel();
    generator.subscribe(Box::new(tx));

    for stage in 1..=generator.total_stages() {
        if stage > 1 {
            generator.grow()?;
            discriminator.grow()?;

            for _ in 0..BLEND_STEPS {
                let blend_factor = generator.update_blend_factor(1. / BLEND_STEPS as f32)?;
                discriminator.update_blend_factor(1. / BLEND_STEPS as f32)?;

                let score = step(&generator, &discriminator, &mut rng)?;
                info!(stage = stage, blend_factor = blend_factor, score = score; "fading in");
            }

            generator.flush()?;
            discriminator.flush()?;
        }

        let score = step(&generator, &discriminator, &mut rng)?;
        info!(
            stage = stage,
            resolution = generator.state().resolution(),
            params = generator.named_parameters().len(),
            score = score;
            "stable"
        );
        info!("generator: {:?}", generator.block_names());
        info!("discriminator: {:?}", discriminator.block_names());
    }

    for event in rx.try_iter() {
        info!("{event:?}");
    }

    Ok(())
}
