/// Splits a condensed answer string such as `"A42B7"` into one token per
/// question.
///
/// Letters and `*` are always single tokens. Two adjacent digits form one
/// token when their value lies in `10..=99`; with a `target_len` they are only
/// merged if enough characters remain to still reach `target_len` tokens.
/// Without a target the merge is unconditional (the looser mode used when no
/// marker row tells us how many questions there are).
pub fn tokenize(line: &str, target_len: Option<usize>) -> Vec<String> {
    let characters = line
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect::<Vec<char>>();
    let mut tokens = Vec::<String>::new();
    let mut index = 0usize;

    while index < characters.len() {
        if let Some(target) = target_len
            && tokens.len() >= target
        {
            break;
        }

        let current = characters[index];
        if !current.is_ascii_digit() {
            tokens.push(current.to_string());
            index += 1;
            continue;
        }

        let next = characters.get(index + 1).copied();
        let two_digit = next
            .filter(char::is_ascii_digit)
            .map(|next| two_digit_value(current, next))
            .filter(|value| (10..=99).contains(value));

        let take_pair = match (two_digit, target_len) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(target)) => {
                let still_needed = target - tokens.len();
                let remaining_after_pair = characters.len() - (index + 2);
                remaining_after_pair + 1 >= still_needed
            }
        };

        if take_pair {
            tokens.push(characters[index..index + 2].iter().collect());
            index += 2;
        } else {
            tokens.push(current.to_string());
            index += 1;
        }
    }

    tokens
}

fn two_digit_value(tens: char, ones: char) -> u32 {
    let tens = tens.to_digit(10).unwrap_or(0);
    let ones = ones.to_digit(10).unwrap_or(0);
    tens * 10 + ones
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn tokenize_keeps_two_digit_answers_when_target_allows() {
        assert_eq!(tokenize("A42B7", Some(4)), tokens(&["A", "42", "B", "7"]));
        assert_eq!(tokenize("99", Some(1)), tokens(&["99"]));
    }

    #[test]
    fn tokenize_splits_digits_when_capacity_is_needed() {
        assert_eq!(tokenize("09", Some(2)), tokens(&["0", "9"]));
        assert_eq!(tokenize("12", Some(2)), tokens(&["1", "2"]));
        assert_eq!(tokenize("A1 2B", Some(4)), tokens(&["A", "1", "2", "B"]));
    }

    #[test]
    fn tokenize_stops_at_target_length() {
        assert_eq!(tokenize("ABCDE", Some(3)), tokens(&["A", "B", "C"]));
    }

    #[test]
    fn tokenize_without_target_merges_greedily() {
        assert_eq!(tokenize("A1234*", None), tokens(&["A", "12", "34", "*"]));
        assert_eq!(tokenize("05", None), tokens(&["0", "5"]));
    }

    #[test]
    fn tokenize_reproduces_joined_tokens_for_known_length() {
        let original = tokens(&["C", "15", "*", "D", "3", "A", "77"]);
        let joined = original.concat();
        assert_eq!(tokenize(&joined, Some(original.len())), original);
    }
}
