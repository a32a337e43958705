use anyhow::{Context, Result};
use divan::{Bencher, black_box};
use rand::{
    SeedableRng,
    distr::{Alphabetic, SampleString},
    prelude::*,
};
use rand_chacha::ChaCha8Rng;

use byodb_btree::{InMemory, Tree, consts};

const DEFAULT_SEED: u64 = 1;

fn main() {
    divan::main()
}

struct Seeder {
    n: usize,
    rng: ChaCha8Rng,
}

impl Seeder {
    fn new(n: usize, seed: u64) -> Self {
        Seeder {
            n,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn seed_tree(self, store: &InMemory) -> Result<Tree<'_, InMemory>> {
        let mut tree = Tree::create(store)?;
        for (i, (k, v)) in self.enumerate() {
            tree = tree
                .insert(k.as_bytes(), v.as_bytes())
                .with_context(|| format!("failed to insert {i}th ({k}, {v})"))?;
        }
        store.reclaim();
        Ok(tree)
    }
}

impl Iterator for Seeder {
    type Item = (String, String);
    fn next(&mut self) -> Option<Self::Item> {
        if self.n == 0 {
            return None;
        }
        self.n -= 1;
        let key_len = self.rng.random_range(1..=consts::MAX_KEY_SIZE);
        let val_len = self.rng.random_range(1..=consts::MAX_VALUE_SIZE);
        let key: String = Alphabetic.sample_string(&mut self.rng, key_len);
        let val: String = Alphabetic.sample_string(&mut self.rng, val_len);
        Some((key, val))
    }
}

#[divan::bench(args = [1000, 4000, 10000])]
fn bench_in_order_iter(b: Bencher, n: usize) {
    let store = InMemory::new();
    let tree = Seeder::new(n, DEFAULT_SEED).seed_tree(&store).unwrap();
    b.counter(n).bench(move || {
        for pair in tree.in_order_iter() {
            let (_k, _v) = black_box(pair.unwrap());
        }
    });
}

#[divan::bench(args = [1000, 4000, 10000])]
fn bench_get(b: Bencher, n: usize) {
    let store = InMemory::new();
    let tree = Seeder::new(n, DEFAULT_SEED).seed_tree(&store).unwrap();
    let keys = Seeder::new(n, DEFAULT_SEED)
        .map(|(k, _)| k)
        .collect::<Vec<_>>();
    b.counter(n).bench(|| {
        for k in &keys {
            black_box(tree.get(k.as_bytes()).unwrap());
        }
    });
}

#[divan::bench(args = [1000, 4000])]
fn bench_insert(b: Bencher, n: usize) {
    let pairs = Seeder::new(n, DEFAULT_SEED).collect::<Vec<_>>();
    b.counter(n).bench(|| {
        let store = InMemory::new();
        let mut tree = Tree::create(&store).unwrap();
        for (k, v) in &pairs {
            tree = tree.insert(k.as_bytes(), v.as_bytes()).unwrap();
            // Keep memory bounded, as a host with no old readers would.
            store.reclaim();
        }
        black_box(tree.page_num());
    });
}

#[divan::bench(args = [1000, 4000])]
fn bench_insert_then_delete(b: Bencher, n: usize) {
    let pairs = Seeder::new(n, DEFAULT_SEED).collect::<Vec<_>>();
    b.counter(n).bench(|| {
        let store = InMemory::new();
        let mut tree = Tree::create(&store).unwrap();
        for (k, v) in &pairs {
            tree = tree.insert(k.as_bytes(), v.as_bytes()).unwrap();
        }
        for (k, _) in &pairs {
            tree = tree.delete(k.as_bytes()).unwrap();
        }
        store.reclaim();
        black_box(tree.page_num());
    });
}
