use busclique::defects::damage;
use busclique::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

enum Family {
    Chimera(usize, usize, usize),
    Pegasus(usize),
}

struct Outcome {
    size: usize,
    found: bool,
    chains: usize,
    max_length: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut family = Family::Pegasus(4);
    let mut size = 8usize;
    let mut sweep = false;
    let mut single = false;
    let mut node_loss = 0.0f64;
    let mut edge_loss = 0.0f64;
    let mut seed: u64 = 0;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--chimera" => {
                let m = parse_arg(&args, i + 1);
                let n = parse_arg(&args, i + 2);
                let t = parse_arg(&args, i + 3);
                family = Family::Chimera(m, n, t);
                i += 4;
            }
            "--pegasus" => {
                family = Family::Pegasus(parse_arg(&args, i + 1));
                i += 2;
            }
            "--size" => {
                size = parse_arg(&args, i + 1);
                i += 2;
            }
            "--node-loss" => {
                node_loss = parse_arg(&args, i + 1);
                i += 2;
            }
            "--edge-loss" => {
                edge_loss = parse_arg(&args, i + 1);
                i += 2;
            }
            "--seed" => {
                seed = parse_arg(&args, i + 1);
                i += 2;
            }
            "--sweep" => {
                sweep = true;
                i += 1;
            }
            "--single" => {
                single = true;
                i += 1;
            }
            "--help" | "-h" => usage_and_exit(0),
            _ => usage_and_exit(2),
        }
    }

    let topology = match family {
        Family::Chimera(m, n, t) => Topology::chimera(m, n, t),
        Family::Pegasus(m) => Topology::pegasus(m),
    };
    let topology = match topology {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Invalid topology: {e}");
            std::process::exit(2);
        }
    };

    let (nodes, edges) = topology.graph();
    let mut rng = StdRng::seed_from_u64(seed);
    let (nodes, edges) = damage(&mut rng, &nodes, &edges, node_loss, edge_loss);
    println!("{topology}: {} qubits, {} couplers", nodes.len(), edges.len());

    let run = |k: usize| {
        let mut emb = Embedding::new();
        let found = if single {
            find_clique_single_realization(&topology, &nodes, &edges, k, &mut emb)
        } else {
            find_clique(&topology, &nodes, &edges, k, &mut emb)
        };
        if found {
            if let Err(e) = verify_clique(&nodes, &edges, &emb, k) {
                eprintln!("Invalid embedding for size {k}: {e}");
                std::process::exit(1);
            }
        }
        Outcome { size: k, found, chains: emb.len(), max_length: max_chain_length(&emb) }
    };

    let outcomes: Vec<Outcome> = if sweep {
        (1..=size).into_par_iter().map(run).collect()
    } else {
        vec![run(size)]
    };

    for o in &outcomes {
        if o.found {
            println!(
                "size {:>3}: ok, {} chains, max chain length {}",
                o.size, o.chains, o.max_length
            );
        } else {
            println!("size {:>3}: not found", o.size);
        }
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[String], i: usize) -> T {
    let v = args.get(i).unwrap_or_else(|| usage_and_exit(2));
    v.parse().unwrap_or_else(|_| usage_and_exit(2))
}

fn usage_and_exit(code: i32) -> ! {
    eprintln!(
        "Usage:\n  busclique [--chimera M N T | --pegasus M] [--size K] [--sweep] [--single]\n            [--node-loss P] [--edge-loss P] [--seed S]\n\nOptions:\n  --chimera M N T     Chimera lattice with M rows, N columns and shore T\n  --pegasus M         Pegasus lattice of size M (default: 4)\n  --size K            Clique size (default: 8)\n  --sweep             Search every size 1..=K in parallel\n  --single            Search only the default realization\n  --node-loss P       Probability of removing each qubit (default: 0)\n  --edge-loss P       Probability of removing each coupler (default: 0)\n  --seed S            Seed for the damage generator (default: 0)\n\nSet RUST_LOG=busclique=debug for search progress.\n"
    );
    std::process::exit(code)
}
