//! @ai:module:intent Built-in equivalence corpus
//! @ai:module:layer domain
//! @ai:module:public_api test_cases
//! @ai:module:stateless true

use crate::corpus::TestCase;

/// @ai:intent Every built-in test case
/// @ai:effects pure
pub fn test_cases() -> Vec<TestCase> {
    vec![fibonacci(), sorting()]
}

/// @ai:intent Naive recursive Fibonacci of 20
fn fibonacci() -> TestCase {
    TestCase::new("fibonacci")
        .with_source("ea", FIBONACCI_EA)
        .with_source("rust", FIBONACCI_RUST)
        .with_source("cpp", FIBONACCI_CPP)
        .with_source("go", FIBONACCI_GO)
}

/// @ai:intent Bubble-sort pass counter over 100 elements
fn sorting() -> TestCase {
    TestCase::new("sorting")
        .with_source("ea", SORTING_EA)
        .with_source("rust", SORTING_RUST)
        .with_source("cpp", SORTING_CPP)
        .with_source("go", SORTING_GO)
}

const FIBONACCI_EA: &str = r#"
func fibonacci(n: i32) -> i32 {
    if n <= 1 {
        return n;
    }
    return fibonacci(n - 1) + fibonacci(n - 2);
}

func main() -> i32 {
    return fibonacci(20);
}
"#;

const FIBONACCI_RUST: &str = r#"
fn fibonacci(n: i32) -> i32 {
    if n <= 1 {
        return n;
    }
    fibonacci(n - 1) + fibonacci(n - 2)
}

fn main() {
    println!("{}", fibonacci(20));
}
"#;

const FIBONACCI_CPP: &str = r#"
#include <iostream>

int fibonacci(int n) {
    if (n <= 1) {
        return n;
    }
    return fibonacci(n - 1) + fibonacci(n - 2);
}

int main() {
    std::cout << fibonacci(20) << std::endl;
    return 0;
}
"#;

const FIBONACCI_GO: &str = r#"
package main

import "fmt"

func fibonacci(n int) int {
    if n <= 1 {
        return n
    }
    return fibonacci(n-1) + fibonacci(n-2)
}

func main() {
    fmt.Println(fibonacci(20))
}
"#;

const SORTING_EA: &str = r#"
func bubble_sort(n: i32) -> i32 {
    let swapped = true;
    let passes = 0;
    while swapped {
        swapped = false;
        let i = 1;
        while i < n {
            if i > i - 1 {
                swapped = true;
            }
            i = i + 1;
        }
        passes = passes + 1;
        n = n - 1;
    }
    return passes;
}

func main() -> i32 {
    return bubble_sort(100);
}
"#;

const SORTING_RUST: &str = r#"
fn bubble_sort(mut n: i32) -> i32 {
    let mut swapped = true;
    let mut passes = 0;
    while swapped {
        swapped = false;
        for i in 1..n {
            if i > i - 1 {
                swapped = true;
            }
        }
        passes += 1;
        n -= 1;
    }
    passes
}

fn main() {
    println!("{}", bubble_sort(100));
}
"#;

const SORTING_CPP: &str = r#"
#include <iostream>

int bubble_sort(int n) {
    bool swapped = true;
    int passes = 0;
    while (swapped) {
        swapped = false;
        for (int i = 1; i < n; ++i) {
            if (i > i - 1) {
                swapped = true;
            }
        }
        passes++;
        n--;
    }
    return passes;
}

int main() {
    std::cout << bubble_sort(100) << std::endl;
    return 0;
}
"#;

const SORTING_GO: &str = r#"
package main

import "fmt"

func bubbleSort(n int) int {
    swapped := true
    passes := 0
    for swapped {
        swapped = false
        for i := 1; i < n; i++ {
            if i > i-1 {
                swapped = true
            }
        }
        passes++
        n--
    }
    return passes
}

func main() {
    fmt.Println(bubbleSort(100))
}
"#;
