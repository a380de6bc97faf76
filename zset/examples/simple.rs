//! Basic in-memory usage: insert a thousand members, then read them back
//! by score, rank, and range.

use zset::Zset;

fn main() {
    let mut z: Zset<i64, _> = Zset::new_in_memory();
    for i in 1..=1000i64 {
        z.zadd(&i.to_string(), i * i - i * 100).unwrap();
    }

    let score = z.zscore("101").expect("101 was inserted");
    assert_eq!(score, 101);

    assert_eq!(z.zrank("1000"), 1000);

    let top_members = z.zrange(1, 3, 0);
    assert_eq!(top_members, vec!["50", "49", "51"]);

    let top_pairs = z.zrange_with_scores(1, 3, 0);
    assert_eq!(
        top_pairs,
        vec![
            ("50".to_string(), -2500),
            ("49".to_string(), -2499),
            ("51".to_string(), -2499),
        ]
    );

    println!("ok");
}
