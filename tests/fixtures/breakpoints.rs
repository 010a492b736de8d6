// // Two breakpoints on tagged lines, hit in line order, then a clean exit.

fn add(a: i32, b: i32) -> i32 {
    a + b // //@ADD@
}

fn main() {
    let sum = add(1, 2); // //@CALL@
    println!("{sum}");
}

// send("1-break-insert " + file_name(test_source) + ":" + str(lines["CALL"]));
// let bp = expect("1^done");
// assert_eq(lines["CALL"], bp.find_int("bkpt.line"));
// assert_eq("1", bp.bkpt.number);
//
// send(format("2-break-insert {0}:{1}", file_name(test_source), lines["ADD"]));
// expect("2^done");
//
// send("3-exec-run");
// expect("3^running");
// checkpoint "stop in add" {
//     let r = expect("*stopped");
//     assert_eq("breakpoint-hit", r.reason);
//     assert_eq("2", r.bkptno);
//     assert_eq(lines["ADD"], r.find_int("frame.line"));
// }
//
// send("4-exec-continue");
// expect("4^running");
// checkpoint "stop at call" {
//     let r = expect("*stopped");
//     assert_eq(lines["CALL"], int(r.frame.line));
// }
//
// send("5-exec-continue");
// expect("5^running");
// assert_eq("exited-normally", expect("*stopped").reason);
//
// send("6-gdb-exit");
// expect("6^exit");
