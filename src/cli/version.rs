/// Display version information
pub fn execute() {
    println!("claimdesk {}", env!("CARGO_PKG_VERSION"));
    println!("Token request desk for community testing programs");
}
