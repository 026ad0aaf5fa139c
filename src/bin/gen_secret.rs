//! Generate a 256-bit signing secret
//!
//! Prints a freshly generated hex-encoded secret suitable for
//! `AUTH_SECRET_KEY` or `HMAC_SECRET_KEY`.

fn main() {
    let bytes: [u8; 32] = rand::random();
    println!("{}", hex::encode(bytes));
}
