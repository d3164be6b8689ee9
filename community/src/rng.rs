use rand::{Error, RngCore, SeedableRng};
use std::fmt;

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

const MIN_SLOTS: usize = 8;
const LINEAR_SCAN: usize = 9;
const PERTURB_SHIFT: u32 = 5;

/// 32-bit Mersenne Twister (MT19937).
///
/// `seed_from_u64` seeds through `init_by_array` with the seed split into
/// 32-bit words, low word first. A seed below 2^32 is a one-word key.
#[derive(Clone)]
pub struct Mt19937 {
    state: [u32; N],
    index: usize,
}

impl Mt19937 {
    /// Seed from a single word (`init_genrand`).
    pub fn new(seed: u32) -> Self {
        let mut state = [0u32; N];
        state[0] = seed;
        for i in 1..N {
            let prev = state[i - 1];
            state[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        Mt19937 { state, index: N }
    }

    /// Seed from a key of words (`init_by_array`). An empty key seeds like `[0]`.
    pub fn with_key(key: &[u32]) -> Self {
        let key: &[u32] = if key.is_empty() { &[0] } else { key };
        let mut mt = Mt19937::new(19_650_218);
        let s = &mut mt.state;

        let mut i = 1;
        let mut j = 0;
        for _ in 0..N.max(key.len()) {
            let prev = s[i - 1];
            s[i] = (s[i] ^ (prev ^ (prev >> 30)).wrapping_mul(1_664_525))
                .wrapping_add(key[j])
                .wrapping_add(j as u32);
            i += 1;
            j += 1;
            if i >= N {
                s[0] = s[N - 1];
                i = 1;
            }
            if j >= key.len() {
                j = 0;
            }
        }
        for _ in 0..N - 1 {
            let prev = s[i - 1];
            s[i] = (s[i] ^ (prev ^ (prev >> 30)).wrapping_mul(1_566_083_941)).wrapping_sub(i as u32);
            i += 1;
            if i >= N {
                s[0] = s[N - 1];
                i = 1;
            }
        }
        s[0] = 0x8000_0000;

        mt
    }

    fn twist(&mut self) {
        for k in 0..N {
            let y = (self.state[k] & UPPER_MASK) | (self.state[(k + 1) % N] & LOWER_MASK);
            let mag = if y & 1 == 1 { MATRIX_A } else { 0 };
            self.state[k] = self.state[(k + M) % N] ^ (y >> 1) ^ mag;
        }
        self.index = 0;
    }
}

impl fmt::Debug for Mt19937 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mt19937").field("index", &self.index).finish()
    }
}

impl RngCore for Mt19937 {
    fn next_u32(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }
        let mut y = self.state[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^ (y >> 18)
    }

    fn next_u64(&mut self) -> u64 {
        let low = u64::from(self.next_u32());
        let high = u64::from(self.next_u32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mt19937 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Mt19937::with_key(&[u32::from_le_bytes(seed)])
    }

    fn seed_from_u64(state: u64) -> Self {
        let low = state as u32;
        let high = (state >> 32) as u32;
        if high == 0 {
            Mt19937::with_key(&[low])
        } else {
            Mt19937::with_key(&[low, high])
        }
    }
}

/// Uniform draw from `0..n`. Returns 0 without drawing when `n` is 0.
///
/// Each attempt takes the top `bit_length(n)` bits of a fresh word (two words,
/// low word first, past 32 bits) and values `>= n` are redrawn.
pub fn below<R: RngCore + ?Sized>(rng: &mut R, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let bits = usize::BITS - n.leading_zeros();
    loop {
        let r = top_bits(rng, bits);
        if r < n as u64 {
            return r as usize;
        }
    }
}

fn top_bits<R: RngCore + ?Sized>(rng: &mut R, bits: u32) -> u64 {
    if bits <= 32 {
        u64::from(rng.next_u32() >> (32 - bits))
    } else {
        let low = u64::from(rng.next_u32());
        let high = u64::from(rng.next_u32() >> (64 - bits));
        (high << 32) | low
    }
}

/// Shuffle `items` in place, swapping each position from the back with one
/// drawn by [`below`].
pub fn shuffle<R: RngCore + ?Sized, T>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = below(rng, i + 1);
        items.swap(i, j);
    }
}

/// Order in which tied labels are enumerated before a random pick.
///
/// `keys` are distinct and inserted in order into an open-addressed table.
/// The table starts with 8 slots and, once 60% full, is rebuilt with the
/// smallest power of two above four times the key count. A key goes to slot
/// `key & mask` or one of the 9 slots after it when they fit, otherwise it
/// jumps to `(5 * i + 1 + perturb) & mask`, `perturb` starting at the key and
/// shifting right by 5 bits per jump. The result lists keys in slot order.
pub fn draw_order(keys: &[usize]) -> Vec<usize> {
    let mut slots: Vec<Option<usize>> = vec![None; MIN_SLOTS];

    for (i, &key) in keys.iter().enumerate() {
        place(&mut slots, key);

        let used = i + 1;
        if used * 5 >= (slots.len() - 1) * 3 {
            let target = if used > 50_000 { used * 2 } else { used * 4 };
            let mut size = MIN_SLOTS;
            while size <= target {
                size <<= 1;
            }
            let old = std::mem::replace(&mut slots, vec![None; size]);
            for key in old.into_iter().flatten() {
                place(&mut slots, key);
            }
        }
    }

    slots.into_iter().flatten().collect()
}

fn place(slots: &mut [Option<usize>], key: usize) {
    let mask = slots.len() - 1;
    let mut perturb = key;
    let mut i = key & mask;

    loop {
        let scan = if i + LINEAR_SCAN <= mask { LINEAR_SCAN } else { 0 };
        if let Some(slot) = slots[i..=i + scan].iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(key);
            return;
        }
        perturb >>= PERTURB_SHIFT;
        i = i.wrapping_mul(5).wrapping_add(1).wrapping_add(perturb) & mask;
    }
}
