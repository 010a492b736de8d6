fn main() {} // //@MAIN@

// send("ping");
// expect("pong");
// log("main is on line " + str(lines["MAIN"]));
