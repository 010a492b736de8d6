fn main() {
    let a = 1; // //@SAME@
    let b = 2; // //@SAME@
}

// send("ping");
// expect("pong");
