use annealnet::{Net, NetSpec, Sample, Search, SearchConfig};

fn main() -> annealnet::Result<()> {
    tracing_subscriber::fmt::init();

    let spec = NetSpec::new(vec![2, 4, 1]).bounds(-8.0, 8.0);
    let mut net = Net::from_spec(&spec)?;

    let samples: Vec<Sample> = vec![
        (vec![0.0, 0.0], vec![0.1]),
        (vec![1.0, 0.0], vec![0.9]),
        (vec![0.0, 1.0], vec![0.9]),
        (vec![1.0, 1.0], vec![0.1]),
    ];

    let config = SearchConfig::default()
        .initial_learn_rate(20.0)
        .error_bar(0.0)
        .max_restarts(64)
        .num_workers(8);

    let result = Search::new(config).run(&mut net, &samples, |cost, _| {
        println!("new best cost = {cost:.6}");
    })?;
    println!("best cost: {:.6}", result.cost);

    for (input, target) in &samples {
        let output = net.evaluate(input)?;
        println!("Input: {:?} -> Output: {:.4} (target {:.1})", input, output[0], target[0]);
    }
    Ok(())
}
