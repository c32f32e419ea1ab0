use corowatch_collector::parse::{count_links, parse_link_statuses, parse_quorum_status, parse_vote_tally};
use corowatch_collector::{assemble, snapshot_to_batch};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const QUORUM_TWO_NODE: &[u8] = include_bytes!("../testdata/quorumtool_two_node.txt");
const CFG_TWO_NODE: &[u8] = include_bytes!("../testdata/cfgtool_two_node.txt");

/// cfgtool output for a node with `links` links and `peers` peers per link.
fn cfgtool_output(links: usize, peers: usize) -> String {
    let mut out = String::from("Local node ID 1, transport knet\n");
    for id in 0..links {
        let status: String = std::iter::once('n')
            .chain("321?".chars().cycle().take(peers))
            .collect();
        out.push_str(&format!(
            "LINK ID {id} knet\n\taddr\t= 10.0.{id}.1\n\tstatus\t= {status}\n"
        ));
    }
    out
}

fn bench_quorumtool(c: &mut Criterion) {
    let mut group = c.benchmark_group("quorumtool");
    group.throughput(Throughput::Bytes(QUORUM_TWO_NODE.len() as u64));

    group.bench_function("quorum_block", |b| {
        b.iter(|| black_box(parse_quorum_status(black_box(QUORUM_TWO_NODE)).unwrap()));
    });
    group.bench_function("votequorum_block", |b| {
        b.iter(|| black_box(parse_vote_tally(black_box(QUORUM_TWO_NODE)).unwrap()));
    });
    group.finish();
}

fn bench_cfgtool_varying_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("cfgtool");

    let configs = vec![
        ("small", 1, 2),
        ("medium", 2, 16),
        ("large", 8, 64),
    ];

    for (name, links, peers) in configs {
        let output = cfgtool_output(links, peers);
        group.throughput(Throughput::Bytes(output.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(name), &output, |b, output| {
            b.iter(|| black_box(parse_link_statuses(output.as_bytes())));
        });
    }
    group.finish();
}

fn bench_count_links(c: &mut Criterion) {
    let status: String = std::iter::once('n')
        .chain("321?x".chars().cycle().take(255))
        .collect();

    c.bench_function("count_links_256", |b| {
        b.iter(|| black_box(count_links(black_box(&status))));
    });
}

fn bench_full_cycle_without_processes(c: &mut Criterion) {
    c.bench_function("assemble_and_convert", |b| {
        b.iter(|| {
            let snapshot = assemble(QUORUM_TWO_NODE, CFG_TWO_NODE).unwrap();
            black_box(snapshot_to_batch(&snapshot, 0))
        });
    });
}

criterion_group!(
    benches,
    bench_quorumtool,
    bench_cfgtool_varying_sizes,
    bench_count_links,
    bench_full_cycle_without_processes,
);
criterion_main!(benches);
