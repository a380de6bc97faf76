//! Plugging in a custom score type: anything `Copy + Default + PartialOrd +
//! AddAssign + Debug + 'static` that knows how to (de)serialize itself
//! works as a `Score`, not just the built-in integer/float impls.

use std::cmp::Ordering;
use std::ops::AddAssign;

use zset::{Score, Zset};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RankedScore {
    x: i32,
    y: f64,
}

impl PartialOrd for RankedScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(match self.x.cmp(&other.x) {
            Ordering::Equal => self.y.partial_cmp(&other.y)?,
            ord => ord,
        })
    }
}

impl AddAssign for RankedScore {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Score for RankedScore {
    const SIZE: usize = 4 + 8;

    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
    }

    fn read_bytes(buf: &[u8]) -> Self {
        let x = i32::from_le_bytes(buf[0..4].try_into().unwrap());
        let y = f64::from_le_bytes(buf[4..12].try_into().unwrap());
        Self { x, y }
    }
}

fn main() {
    let mut z: Zset<RankedScore, _> = Zset::new_in_memory();
    z.zadd("A", RankedScore { x: 1, y: 2.2 }).unwrap();
    z.zadd("B", RankedScore { x: 1, y: 2.3 }).unwrap();
    z.zadd("C", RankedScore { x: 4, y: 5.6 }).unwrap();
    assert_eq!(z.zrank("B"), 2);

    println!("ok");
}
