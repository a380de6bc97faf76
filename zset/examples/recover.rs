//! Persistence across a restart: populate a zset, drop it, reopen the same
//! path, and confirm the data and the skiplist's structural state survived.

use tempfile::TempDir;
use zset::{EngineOptions, Zset};

fn main() {
    env_logger::init();

    let dir = TempDir::new().expect("tempdir");
    let options = EngineOptions {
        path: dir.path().to_path_buf(),
        ..Default::default()
    };

    {
        let mut z: Zset<i64, _> = Zset::open_persistent(&options).unwrap();
        for i in 1..=1000i64 {
            z.zadd(&i.to_string(), i * i - i * 100).unwrap();
        }
    }

    let mut z: Zset<i64, _> = Zset::open_persistent(&options).unwrap();
    let score = z.zscore("101").expect("101 survived the reopen");
    assert_eq!(score, 101);
    assert_eq!(z.zrank("1000"), 1000);
    assert_eq!(z.zcard(), 1000);

    println!("ok");
}
